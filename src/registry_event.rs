/// Events emitted by a [`Registry`](crate::Registry) during mutating operations.
///
/// These events are passed to the tracing callback set via
/// [`Registry::set_trace_callback`](crate::Registry::set_trace_callback).
/// The `Clone` derive allows callbacks to store or forward events if needed.
///
/// # Examples
///
/// ```rust
/// use dimension_registry::RegistryEvent;
///
/// let event = RegistryEvent::Remove {
///     item_name: "svc".into(),
///     dimension: "types".into(),
/// };
/// assert_eq!(event.to_string(), "remove { item_name: svc, dimension: types }");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryEvent {
    /// An entry was stored.
    Register {
        item_name: String,
        dimension: String,
        /// Number of aliases pointed at the entry by this registration.
        alias_count: usize,
        /// Whether the registration carried any metadata.
        has_metadata: bool,
        /// Whether an existing entry was overwritten.
        replaced: bool,
    },

    /// An entry was removed.
    Remove { item_name: String, dimension: String },

    /// A dimension, or the whole registry when `dimension` is `None`, was cleared.
    Clear {
        dimension: Option<String>,
        /// Number of entries dropped by the clear.
        removed: usize,
    },
}

impl RegistryEvent {
    /// Operation tag used in structured log records.
    pub fn operation(&self) -> &'static str {
        match self {
            RegistryEvent::Register { .. } => "register",
            RegistryEvent::Remove { .. } => "remove",
            RegistryEvent::Clear { .. } => "clear",
        }
    }
}

impl std::fmt::Display for RegistryEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegistryEvent::Register {
                item_name,
                dimension,
                alias_count,
                has_metadata,
                replaced,
            } => write!(
                f,
                "register {{ item_name: {item_name}, dimension: {dimension}, aliases: {alias_count}, metadata: {has_metadata}, replaced: {replaced} }}"
            ),
            RegistryEvent::Remove {
                item_name,
                dimension,
            } => write!(f, "remove {{ item_name: {item_name}, dimension: {dimension} }}"),
            RegistryEvent::Clear {
                dimension: Some(dimension),
                removed,
            } => write!(f, "clear {{ dimension: {dimension}, removed: {removed} }}"),
            RegistryEvent::Clear {
                dimension: None,
                removed,
            } => write!(f, "clear {{ removed: {removed} }}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_event_display() {
        let event = RegistryEvent::Register {
            item_name: "svc".into(),
            dimension: "types".into(),
            alias_count: 1,
            has_metadata: false,
            replaced: false,
        };
        assert_eq!(
            event.to_string(),
            "register { item_name: svc, dimension: types, aliases: 1, metadata: false, replaced: false }"
        );

        let event = RegistryEvent::Clear {
            dimension: Some("command".into()),
            removed: 3,
        };
        assert_eq!(event.to_string(), "clear { dimension: command, removed: 3 }");

        let event = RegistryEvent::Clear {
            dimension: None,
            removed: 0,
        };
        assert_eq!(event.to_string(), "clear { removed: 0 }");
    }

    #[test]
    fn test_operation_tags() {
        let remove = RegistryEvent::Remove {
            item_name: "n".into(),
            dimension: "d".into(),
        };
        assert_eq!(remove.operation(), "remove");
        assert_eq!(
            RegistryEvent::Clear {
                dimension: None,
                removed: 0
            }
            .operation(),
            "clear"
        );
    }

    #[test]
    fn test_registry_event_clone() {
        let event = RegistryEvent::Remove {
            item_name: "n".into(),
            dimension: "d".into(),
        };
        let cloned = event.clone();
        assert_eq!(event, cloned);
    }
}
