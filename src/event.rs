/// Events emitted by a registry during operations.
///
/// These events are passed to the tracing callback set via `set_trace_callback`.
/// Targets are carried as their `Debug` rendering so one callback type serves
/// every target type.
///
/// # Examples
///
/// ```rust
/// use visibility_registry::ObserverEvent;
///
/// let event = ObserverEvent::Observe { target: "7".into(), added: true };
/// assert_eq!(event.to_string(), "observe { target: 7, added: true }");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum ObserverEvent {
    /// An `observe` call; `added` is false for a suppressed duplicate.
    Observe { target: String, added: bool },

    /// An `unobserve` call; `found` tells whether a registration existed.
    Unobserve { target: String, found: bool },

    /// A record for a registered target was processed.
    Deliver { target: String, invoked: bool },

    /// A one-shot registration was removed after delivery.
    Expire { target: String },

    /// A registered target was found detached during `flush` and released.
    Detached { target: String },

    /// A callback panicked while handling a record.
    CallbackPanicked { target: String, message: String },

    /// A fresh monitor was connected.
    Connect,

    /// The monitor was stopped and `released` registrations dropped.
    Disconnect { released: usize },
}

impl std::fmt::Display for ObserverEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ObserverEvent::Observe { target, added } => {
                write!(f, "observe {{ target: {target}, added: {added} }}")
            }
            ObserverEvent::Unobserve { target, found } => {
                write!(f, "unobserve {{ target: {target}, found: {found} }}")
            }
            ObserverEvent::Deliver { target, invoked } => {
                write!(f, "deliver {{ target: {target}, invoked: {invoked} }}")
            }
            ObserverEvent::Expire { target } => write!(f, "expire {{ target: {target} }}"),
            ObserverEvent::Detached { target } => write!(f, "detached {{ target: {target} }}"),
            ObserverEvent::CallbackPanicked { target, message } => {
                write!(f, "callback panicked {{ target: {target}, message: {message} }}")
            }
            ObserverEvent::Connect => write!(f, "Connecting the monitor"),
            ObserverEvent::Disconnect { released } => {
                write!(f, "Disconnecting the monitor ({released} released)")
            }
        }
    }
}
