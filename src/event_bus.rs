/*
    Copyright © 2024, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The thread that hands published [events](crate::events) to their handlers.
//!
//! Handlers run on the event bus thread, never on the thread that committed or applied a
//! configuration, so a slow handler cannot hold up block delivery.

use std::{
    sync::mpsc::{Receiver, RecvTimeoutError, TryRecvError},
    thread::{self, JoinHandle},
    time::Duration,
};

use crate::{events::*, logging::Logger};

pub(crate) type HandlerPtr<T> = Box<dyn Fn(&T) + Send>;

const POLL_INTERVAL: Duration = Duration::from_millis(10);

pub(crate) struct EventHandlers {
    pub(crate) reload_config_handlers: Vec<HandlerPtr<ReloadConfigEvent>>,
    pub(crate) commit_config_handlers: Vec<HandlerPtr<CommitConfigEvent>>,
    pub(crate) apply_bundle_handlers: Vec<HandlerPtr<ApplyBundleEvent>>,
    pub(crate) update_orderers_handlers: Vec<HandlerPtr<UpdateOrderersEvent>>,
    pub(crate) discard_config_handlers: Vec<HandlerPtr<DiscardConfigEvent>>,
}

impl EventHandlers {
    /// Collect the user-defined handlers, adding the default logging handler of every event type in
    /// front of them if `log_events` is set.
    pub(crate) fn new(
        log_events: bool,
        reload_config_handler: Option<HandlerPtr<ReloadConfigEvent>>,
        commit_config_handler: Option<HandlerPtr<CommitConfigEvent>>,
        apply_bundle_handler: Option<HandlerPtr<ApplyBundleEvent>>,
        update_orderers_handler: Option<HandlerPtr<UpdateOrderersEvent>>,
        discard_config_handler: Option<HandlerPtr<DiscardConfigEvent>>,
    ) -> EventHandlers {
        fn handlers<T: Logger>(log_events: bool, user: Option<HandlerPtr<T>>) -> Vec<HandlerPtr<T>> {
            let mut handlers = Vec::new();
            if log_events {
                handlers.push(T::get_logger());
            }
            handlers.extend(user);
            handlers
        }

        EventHandlers {
            reload_config_handlers: handlers(log_events, reload_config_handler),
            commit_config_handlers: handlers(log_events, commit_config_handler),
            apply_bundle_handlers: handlers(log_events, apply_bundle_handler),
            update_orderers_handlers: handlers(log_events, update_orderers_handler),
            discard_config_handlers: handlers(log_events, discard_config_handler),
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.reload_config_handlers.is_empty()
            && self.commit_config_handlers.is_empty()
            && self.apply_bundle_handlers.is_empty()
            && self.update_orderers_handlers.is_empty()
            && self.discard_config_handlers.is_empty()
    }

    pub(crate) fn fire_handlers(&self, event: Event) {
        match event {
            Event::ReloadConfig(reload_config_event) => self
                .reload_config_handlers
                .iter()
                .for_each(|handler| handler(&reload_config_event)),

            Event::CommitConfig(commit_config_event) => self
                .commit_config_handlers
                .iter()
                .for_each(|handler| handler(&commit_config_event)),

            Event::ApplyBundle(apply_bundle_event) => self
                .apply_bundle_handlers
                .iter()
                .for_each(|handler| handler(&apply_bundle_event)),

            Event::UpdateOrderers(update_orderers_event) => self
                .update_orderers_handlers
                .iter()
                .for_each(|handler| handler(&update_orderers_event)),

            Event::DiscardConfig(discard_config_event) => self
                .discard_config_handlers
                .iter()
                .for_each(|handler| handler(&discard_config_event)),
        }
    }
}

/// Start the event bus thread.
///
/// The thread returns once `shutdown_signal` fires (or its sender is dropped), after handing every
/// event that was published before the signal to its handlers.
pub(crate) fn start_event_bus(
    event_handlers: EventHandlers,
    event_subscriber: Receiver<Event>,
    shutdown_signal: Receiver<()>,
) -> JoinHandle<()> {
    thread::spawn(move || loop {
        match shutdown_signal.try_recv() {
            Ok(()) | Err(TryRecvError::Disconnected) => {
                while let Ok(event) = event_subscriber.try_recv() {
                    event_handlers.fire_handlers(event)
                }
                return;
            }
            Err(TryRecvError::Empty) => (),
        }

        match event_subscriber.recv_timeout(POLL_INTERVAL) {
            Ok(event) => event_handlers.fire_handlers(event),
            Err(RecvTimeoutError::Timeout) => (),
            // Every publisher is gone; nothing more can arrive.
            Err(RecvTimeoutError::Disconnected) => return,
        }
    })
}
