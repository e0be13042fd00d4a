//! The message bus that connects every component of the engine.
//!
//! Components never hold references to one another. Each one is registered
//! with a [`Broker`], publishes through the [`Context`] it is handed, and
//! observes its peers through the messages fanned out to its
//! [`Component::receive`] handler.

use crate::clock::Segment;
use crate::common::ComponentId;
use crate::error::{ReflexError, Result};
use crate::events::{Envelope, Message, Process};
use slotmap::SlotMap;
use std::any::Any;
use std::collections::HashMap;
use std::marker::PhantomData;
use tracing::{debug, trace};

/// Type-erasure helper that lets the broker hand typed components back out.
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// A participant on the bus.
pub trait Component: AsAny + Send {
    /// The routing name of this component. Must be unique per broker.
    fn name(&self) -> &str;

    /// Called exactly once, right after registration and before the component
    /// receives any message.
    fn initialize(&mut self, _ctx: &mut Context<'_>) -> Result<()> {
        Ok(())
    }

    /// Called for every publication on the bus, including the component's own.
    ///
    /// By the time this runs the broker has already stored the message in this
    /// component's mirror of the sender.
    fn receive(&mut self, envelope: Envelope<'_>, ctx: &mut Context<'_>) -> Result<()>;
}

/// The last value seen for each property of one component.
#[derive(Debug, Clone, Default)]
pub struct PeerState {
    properties: HashMap<String, Message>,
}

impl PeerState {
    fn record(&mut self, message: &Message) {
        self.properties
            .insert(message.property().to_string(), message.clone());
    }

    /// The last message published under `property`.
    pub fn get(&self, property: &str) -> Option<&Message> {
        self.properties.get(property)
    }

    /// Iterates over every `(property, message)` pair, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Message)> {
        self.properties.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn process(&self) -> Option<Process> {
        match self.get("process") {
            Some(Message::Process(process)) => Some(*process),
            _ => None,
        }
    }

    pub fn seconds(&self) -> Option<u64> {
        match self.get("seconds") {
            Some(Message::Seconds(seconds)) => Some(*seconds),
            _ => None,
        }
    }

    pub fn timescale(&self) -> Option<u32> {
        match self.get("timescaleMultiplier") {
            Some(Message::TimescaleMultiplier(n)) => Some(*n),
            _ => None,
        }
    }

    pub fn segments(&self) -> Option<&[Segment]> {
        match self.get("sessionSegments") {
            Some(Message::SessionSegments(segments)) => Some(segments),
            _ => None,
        }
    }
}

/// A component's eventually-consistent copies of its peers' published state.
#[derive(Debug, Clone, Default)]
pub struct Mirror {
    peers: HashMap<String, PeerState>,
}

impl Mirror {
    fn record(&mut self, sender: &str, message: &Message) {
        self.peers
            .entry(sender.to_string())
            .or_default()
            .record(message);
    }

    /// The mirrored state of the peer registered as `name`.
    pub fn peer(&self, name: &str) -> Option<&PeerState> {
        self.peers.get(name)
    }
}

/// What a component gets while it handles an input or a message: read access
/// to its mirror and a way to publish.
pub struct Context<'a> {
    mirror: &'a Mirror,
    outbox: Vec<Message>,
}

impl<'a> Context<'a> {
    fn new(mirror: &'a Mirror) -> Self {
        Self {
            mirror,
            outbox: Vec::new(),
        }
    }

    /// Publishes `message` as the current component.
    ///
    /// Delivery happens as soon as the running handler returns, before the
    /// broker moves on to the next receiver.
    pub fn send(&mut self, message: Message) {
        self.outbox.push(message);
    }

    /// The mirrored state of the peer registered as `name`.
    pub fn peer(&self, name: &str) -> Option<&'a PeerState> {
        self.mirror.peer(name)
    }

    pub fn mirror(&self) -> &'a Mirror {
        self.mirror
    }

    fn into_outbox(self) -> Vec<Message> {
        self.outbox
    }
}

/// A typed reference to a registered component.
pub struct Handle<C> {
    id: ComponentId,
    _component: PhantomData<fn() -> C>,
}

impl<C> Handle<C> {
    pub fn id(&self) -> ComponentId {
        self.id
    }
}

impl<C> Clone for Handle<C> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<C> Copy for Handle<C> {}

impl<C> std::fmt::Debug for Handle<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Handle").field(&self.id).finish()
    }
}

struct Entry {
    name: String,
    component: Box<dyn Component>,
    /// The component's own bus-visible state.
    state: PeerState,
    mirror: Mirror,
}

/// The publish-and-fan-out mediator.
///
/// One broker is created per game and owns every component. Delivery is
/// synchronous: [`Broker::publish`] returns only after every receiver, and
/// everything those receivers published in turn, has been handled.
#[derive(Default)]
pub struct Broker {
    entries: SlotMap<ComponentId, Entry>,
    names: HashMap<String, ComponentId>,
    order: Vec<ComponentId>,
    published: u64,
}

impl Broker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `component`, runs its `initialize` hook and fans out anything
    /// it sent while initializing.
    pub fn register<C: Component>(&mut self, component: C) -> Result<Handle<C>> {
        let name = component.name().to_string();
        if self.names.contains_key(&name) {
            return Err(ReflexError::DuplicateComponent(name));
        }

        let id = self.entries.insert(Entry {
            name: name.clone(),
            component: Box::new(component),
            state: PeerState::default(),
            mirror: Mirror::default(),
        });
        self.names.insert(name.clone(), id);
        self.order.push(id);
        debug!(component = %name, position = self.order.len(), "Component registered");

        let outbox = {
            let entry = &mut self.entries[id];
            let mut ctx = Context::new(&entry.mirror);
            entry.component.initialize(&mut ctx)?;
            ctx.into_outbox()
        };
        for message in outbox {
            self.publish(id, message)?;
        }

        Ok(Handle {
            id,
            _component: PhantomData,
        })
    }

    /// Publishes `message` on behalf of `sender` and delivers it to every
    /// registered component in registration order.
    pub fn publish(&mut self, sender: ComponentId, message: Message) -> Result<()> {
        if let Message::Custom { property, .. } = &message {
            if Message::BUILTIN_PROPERTIES.contains(&property.as_str()) {
                return Err(ReflexError::MalformedMessage {
                    property: property.clone(),
                    reason: "custom messages cannot use a built-in property name".to_string(),
                });
            }
        }

        let sender_name = match self.entries.get_mut(sender) {
            Some(entry) => {
                entry.state.record(&message);
                entry.name.clone()
            }
            None => return Err(ReflexError::UnregisteredSender(format!("{:?}", sender))),
        };
        self.published += 1;
        trace!(sender = %sender_name, property = message.property(), "Fanning out message");

        for index in 0..self.order.len() {
            let receiver = self.order[index];
            let outbox = {
                let entry = &mut self.entries[receiver];
                entry.mirror.record(&sender_name, &message);
                let envelope = Envelope {
                    sender: &sender_name,
                    message: &message,
                };
                let mut ctx = Context::new(&entry.mirror);
                entry.component.receive(envelope, &mut ctx)?;
                ctx.into_outbox()
            };
            for nested in outbox {
                self.publish(receiver, nested)?;
            }
        }
        Ok(())
    }

    /// Publishes on behalf of the component registered as `sender`.
    pub fn publish_as(&mut self, sender: &str, message: Message) -> Result<()> {
        let id = self
            .names
            .get(sender)
            .copied()
            .ok_or_else(|| ReflexError::UnregisteredSender(sender.to_string()))?;
        self.publish(id, message)
    }

    /// Runs an input handler against a typed component, then fans out whatever
    /// it sent.
    pub fn act<C, R, F>(&mut self, handle: &Handle<C>, f: F) -> Result<R>
    where
        C: Component,
        F: FnOnce(&mut C, &mut Context<'_>) -> Result<R>,
    {
        let (result, outbox) = {
            let entry = self
                .entries
                .get_mut(handle.id)
                .ok_or_else(|| ReflexError::UnregisteredSender(format!("{:?}", handle.id)))?;
            let name = &entry.name;
            let component: &mut dyn Component = entry.component.as_mut();
            let component = component.as_any_mut().downcast_mut::<C>().ok_or_else(|| {
                ReflexError::ComponentType {
                    name: name.clone(),
                    expected: std::any::type_name::<C>(),
                }
            })?;
            let mut ctx = Context::new(&entry.mirror);
            let result = f(component, &mut ctx)?;
            (result, ctx.into_outbox())
        };
        for message in outbox {
            self.publish(handle.id, message)?;
        }
        Ok(result)
    }

    /// Borrows a typed component for reading.
    pub fn inspect<C: Component>(&self, handle: &Handle<C>) -> Result<&C> {
        let entry = self
            .entries
            .get(handle.id)
            .ok_or_else(|| ReflexError::UnregisteredSender(format!("{:?}", handle.id)))?;
        let component: &dyn Component = entry.component.as_ref();
        component
            .as_any()
            .downcast_ref::<C>()
            .ok_or_else(|| ReflexError::ComponentType {
                name: entry.name.clone(),
                expected: std::any::type_name::<C>(),
            })
    }

    /// The bus-visible state of the component registered as `name`.
    pub fn state_of(&self, name: &str) -> Option<&PeerState> {
        let id = self.names.get(name)?;
        self.entries.get(*id).map(|entry| &entry.state)
    }

    /// The mirror held by the component registered as `name`.
    pub fn mirror_of(&self, name: &str) -> Option<&Mirror> {
        let id = self.names.get(name)?;
        self.entries.get(*id).map(|entry| &entry.mirror)
    }

    /// Component names in registration order.
    pub fn components(&self) -> impl Iterator<Item = &str> {
        self.order
            .iter()
            .map(move |id| self.entries[*id].name.as_str())
    }

    /// Total number of publications, nested ones included.
    pub fn published(&self) -> u64 {
        self.published
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::Value;
    use std::sync::{Arc, Mutex};

    type Journal = Arc<Mutex<Vec<String>>>;

    /// Records every delivery and optionally echoes one property once.
    struct Probe {
        name: &'static str,
        journal: Journal,
        initialized: u32,
        echo_on: Option<&'static str>,
    }

    impl Probe {
        fn new(name: &'static str, journal: &Journal) -> Self {
            Self {
                name,
                journal: journal.clone(),
                initialized: 0,
                echo_on: None,
            }
        }
    }

    impl Component for Probe {
        fn name(&self) -> &str {
            self.name
        }

        fn initialize(&mut self, _ctx: &mut Context<'_>) -> Result<()> {
            self.initialized += 1;
            Ok(())
        }

        fn receive(&mut self, envelope: Envelope<'_>, ctx: &mut Context<'_>) -> Result<()> {
            self.journal.lock().unwrap().push(format!(
                "{}<-{}.{}",
                self.name,
                envelope.sender,
                envelope.message.property()
            ));
            if let (Some(trigger), Message::Custom { property, .. }) =
                (self.echo_on, envelope.message)
            {
                if property == trigger {
                    ctx.send(Message::Custom {
                        property: "echo".to_string(),
                        value: Value::Null,
                    });
                }
            }
            Ok(())
        }
    }

    fn custom(property: &str) -> Message {
        Message::Custom {
            property: property.to_string(),
            value: Value::Bool(true),
        }
    }

    #[test]
    fn register_initializes_exactly_once() {
        let journal = Journal::default();
        let mut broker = Broker::new();
        let handle = broker.register(Probe::new("a", &journal)).unwrap();
        broker.publish(handle.id(), custom("ping")).unwrap();
        assert_eq!(broker.inspect(&handle).unwrap().initialized, 1);
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let journal = Journal::default();
        let mut broker = Broker::new();
        broker.register(Probe::new("a", &journal)).unwrap();
        let err = broker.register(Probe::new("a", &journal)).unwrap_err();
        assert!(matches!(err, ReflexError::DuplicateComponent(name) if name == "a"));
    }

    #[test]
    fn fan_out_includes_sender_in_registration_order() {
        let journal = Journal::default();
        let mut broker = Broker::new();
        broker.register(Probe::new("a", &journal)).unwrap();
        let b = broker.register(Probe::new("b", &journal)).unwrap();
        broker.register(Probe::new("c", &journal)).unwrap();

        broker.publish(b.id(), custom("ping")).unwrap();

        assert_eq!(
            *journal.lock().unwrap(),
            vec!["a<-b.ping", "b<-b.ping", "c<-b.ping"]
        );
        assert_eq!(broker.components().collect::<Vec<_>>(), vec!["a", "b", "c"]);
    }

    #[test]
    fn nested_publications_are_delivered_depth_first() {
        let journal = Journal::default();
        let mut broker = Broker::new();
        let a = broker.register(Probe::new("a", &journal)).unwrap();
        let mut echoer = Probe::new("b", &journal);
        echoer.echo_on = Some("ping");
        broker.register(echoer).unwrap();
        broker.register(Probe::new("c", &journal)).unwrap();

        broker.publish(a.id(), custom("ping")).unwrap();

        assert_eq!(
            *journal.lock().unwrap(),
            vec![
                "a<-a.ping",
                "b<-a.ping",
                "a<-b.echo",
                "b<-b.echo",
                "c<-b.echo",
                "c<-a.ping",
            ]
        );
        assert_eq!(broker.published(), 2);
    }

    #[test]
    fn publishing_records_sender_state_and_mirrors() {
        let journal = Journal::default();
        let mut broker = Broker::new();
        let a = broker.register(Probe::new("a", &journal)).unwrap();
        broker.register(Probe::new("b", &journal)).unwrap();

        broker.publish(a.id(), Message::Seconds(3)).unwrap();
        broker.publish(a.id(), Message::Seconds(4)).unwrap();

        assert_eq!(broker.state_of("a").unwrap().seconds(), Some(4));
        let mirrored = broker.mirror_of("b").unwrap().peer("a").unwrap();
        assert_eq!(mirrored.seconds(), Some(4));
        assert!(broker.state_of("b").unwrap().get("seconds").is_none());
    }

    #[test]
    fn unknown_sender_fails_fast() {
        let journal = Journal::default();
        let mut broker = Broker::new();
        broker.register(Probe::new("a", &journal)).unwrap();

        let err = broker.publish_as("ghost", custom("ping")).unwrap_err();
        assert!(matches!(err, ReflexError::UnregisteredSender(name) if name == "ghost"));
        assert!(journal.lock().unwrap().is_empty());
    }

    #[test]
    fn custom_message_cannot_shadow_builtin_property() {
        let journal = Journal::default();
        let mut broker = Broker::new();
        let a = broker.register(Probe::new("a", &journal)).unwrap();

        let err = broker
            .publish(
                a.id(),
                Message::Custom {
                    property: "seconds".to_string(),
                    value: Value::Text("soon".to_string()),
                },
            )
            .unwrap_err();
        assert!(matches!(err, ReflexError::MalformedMessage { .. }));
        assert!(broker.state_of("a").unwrap().get("seconds").is_none());
    }

    #[test]
    fn act_publishes_after_the_handler_returns() {
        let journal = Journal::default();
        let mut broker = Broker::new();
        let a = broker.register(Probe::new("a", &journal)).unwrap();
        broker.register(Probe::new("b", &journal)).unwrap();

        let initialized = broker
            .act(&a, |probe, ctx| {
                ctx.send(custom("hello"));
                Ok(probe.initialized)
            })
            .unwrap();

        assert_eq!(initialized, 1);
        assert_eq!(*journal.lock().unwrap(), vec!["a<-a.hello", "b<-a.hello"]);
    }
}
