//! Named-event emitter
//!
//! Handlers come from two places: the option handler bag applied with
//! [`Emitter::set_options`] (one per event name) and handlers attached with
//! [`Emitter::on`]. The bag's handler runs first. Handlers may attach,
//! detach or trigger while an event is being delivered; each trigger works
//! on a snapshot of the handler list.

use crate::api::CalendarApi;
use indexmap::IndexMap;
use kalends_core::Value;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// A listener; receives the bound context and the event payload
pub type Handler = Rc<dyn Fn(Option<&dyn CalendarApi>, &Value)>;

/// Option-driven handlers keyed by event name (`"loading"`, ...)
pub type HandlerBag = IndexMap<String, Handler>;

/// Token returned by [`Emitter::on`], used to detach the handler again
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

#[derive(Default)]
pub struct Emitter {
    handlers: RefCell<IndexMap<String, Vec<(HandlerId, Handler)>>>,
    options: RefCell<Rc<HandlerBag>>,
    this_context: RefCell<Option<Rc<dyn CalendarApi>>>,
    next_id: Cell<u64>,
}

impl Emitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind the context every handler receives
    pub fn set_this_context(&self, context: Rc<dyn CalendarApi>) {
        *self.this_context.borrow_mut() = Some(context);
    }

    /// Replace the option handler bag
    pub fn set_options(&self, options: Rc<HandlerBag>) {
        *self.options.borrow_mut() = options;
    }

    pub fn on(&self, name: impl Into<String>, handler: Handler) -> HandlerId {
        let id = HandlerId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        self.handlers.borrow_mut().entry(name.into()).or_default().push((id, handler));
        id
    }

    /// Detach one handler, or every attached handler for `name` when `id` is `None`
    pub fn off(&self, name: &str, id: Option<HandlerId>) {
        let mut handlers = self.handlers.borrow_mut();
        match id {
            Some(id) => {
                if let Some(list) = handlers.get_mut(name) {
                    list.retain(|(existing, _)| *existing != id);
                    if list.is_empty() {
                        handlers.shift_remove(name);
                    }
                }
            }
            None => {
                handlers.shift_remove(name);
            }
        }
    }

    pub fn has_handlers(&self, name: &str) -> bool {
        self.options.borrow().contains_key(name) || self.handlers.borrow().get(name).is_some_and(|l| !l.is_empty())
    }

    /// Deliver `payload` to every handler of `name`
    pub fn trigger(&self, name: &str, payload: &Value) {
        let option_handler = self.options.borrow().get(name).cloned();
        let attached: Vec<Handler> = self
            .handlers
            .borrow()
            .get(name)
            .map(|list| list.iter().map(|(_, h)| h.clone()).collect())
            .unwrap_or_default();
        let context = self.this_context.borrow().clone();

        tracing::trace!(event = name, handlers = attached.len() + option_handler.is_some() as usize, "trigger");
        for handler in option_handler.into_iter().chain(attached) {
            handler(context.as_deref(), payload);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder(log: &Rc<RefCell<Vec<String>>>, tag: &'static str) -> Handler {
        let log = log.clone();
        Rc::new(move |_: Option<&dyn CalendarApi>, payload: &Value| log.borrow_mut().push(format!("{tag}:{payload}")))
    }

    #[test]
    fn test_option_handler_runs_before_attached() {
        let emitter = Emitter::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        emitter.on("loading", recorder(&log, "attached"));
        let mut bag = HandlerBag::new();
        bag.insert("loading".to_string(), recorder(&log, "option"));
        emitter.set_options(Rc::new(bag));

        emitter.trigger("loading", &Value::Bool(true));
        assert_eq!(*log.borrow(), vec!["option:true", "attached:true"]);
    }

    #[test]
    fn test_off_detaches() {
        let emitter = Emitter::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        let first = emitter.on("loading", recorder(&log, "a"));
        emitter.on("loading", recorder(&log, "b"));

        emitter.off("loading", Some(first));
        emitter.trigger("loading", &Value::Bool(false));
        assert_eq!(*log.borrow(), vec!["b:false"]);

        emitter.off("loading", None);
        assert!(!emitter.has_handlers("loading"));
    }

    #[test]
    fn test_handler_may_attach_during_trigger() {
        let emitter = Rc::new(Emitter::new());
        let log = Rc::new(RefCell::new(Vec::new()));
        let inner = emitter.clone();
        let late = recorder(&log, "late");
        emitter.on(
            "ping",
            Rc::new(move |_: Option<&dyn CalendarApi>, _: &Value| {
                inner.on("ping", late.clone());
            }),
        );

        emitter.trigger("ping", &Value::Null);
        assert!(log.borrow().is_empty());
        emitter.trigger("ping", &Value::Int(1));
        assert_eq!(*log.borrow(), vec!["late:1"]);
    }
}
