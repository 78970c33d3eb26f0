//! Command registration on top of [`Registry`].
//!
//! Commands live in the `"command"` dimension under their full dotted name
//! (`"container.volumes.backup"`). The part before the last dot is the parent
//! group path; when a [`CliAdapter`] is available the groups along that path
//! are created before the command itself.
//!
//! ```
//! use dimension_registry::{CommandFn, CommandOptions, CommandRegistrar, GroupAdapter, Registry};
//! use std::sync::Arc;
//!
//! let registry = Registry::new();
//! let registrar = CommandRegistrar::new(&registry).with_adapter(Arc::new(GroupAdapter));
//!
//! let backup = CommandFn::new("backup", |_args: &[String]| Ok(()));
//! let info = registrar
//!     .register_with(backup, CommandOptions::new().name("container.volumes.backup"))
//!     .unwrap();
//!
//! assert_eq!(info.full_name, "container.volumes.backup");
//! assert_eq!(info.parent.as_deref(), Some("container.volumes"));
//! assert!(registrar.get("container.volumes").unwrap().is_group());
//! ```

use std::fmt;
use std::sync::{Arc, LazyLock, OnceLock};

use parking_lot::RwLock;
use serde_json::json;

use crate::registry_entry::{Metadata, StoredValue};
use crate::{RegisterOptions, Registry, RegistryConfig, RegistryError};

/// Dimension holding every registered command and group.
pub const COMMAND_DIMENSION: &str = "command";

/// Name of the [`LockManager`](crate::LockManager) lock guarding the command registry.
pub const COMMAND_LOCK_NAME: &str = "registry.command";

/// Callable behind a command. Argument parsing is left to the CLI layer.
pub type CommandHandler = Arc<dyn Fn(&[String]) -> anyhow::Result<()> + Send + Sync>;

static COMMAND_REGISTRY: LazyLock<Registry> = LazyLock::new(|| {
    Registry::with_config(RegistryConfig {
        label: COMMAND_DIMENSION.to_owned(),
        lock_name: Some(COMMAND_LOCK_NAME.to_owned()),
        ..RegistryConfig::default()
    })
});

static CLI_ADAPTER: OnceLock<Arc<dyn CliAdapter>> = OnceLock::new();

/// The process-wide command registry.
///
/// Created on first use and kept for the lifetime of the process; only an
/// explicit [`Registry::clear`] empties it.
pub fn command_registry() -> &'static Registry {
    &COMMAND_REGISTRY
}

/// Install the CLI adapter used by [`register_command`] and
/// [`register_command_with`]. Call once at startup.
///
/// Returns `false` if an adapter was already installed; the first one stays.
pub fn install_cli_adapter(adapter: Arc<dyn CliAdapter>) -> bool {
    CLI_ADAPTER.set(adapter).is_ok()
}

pub fn cli_adapter() -> Option<Arc<dyn CliAdapter>> {
    CLI_ADAPTER.get().cloned()
}

/// Registrar bound to the process-wide registry and installed adapter.
pub fn registrar() -> CommandRegistrar<'static> {
    CommandRegistrar {
        registry: command_registry(),
        adapter: cli_adapter(),
    }
}

/// Register `target` under its own name, without a parent group.
pub fn register_command(
    target: impl Into<CommandTarget>,
) -> Result<Arc<CommandInfo>, RegistryError> {
    registrar().register(target)
}

/// Register `target` as described by `options`.
pub fn register_command_with(
    target: impl Into<CommandTarget>,
    options: CommandOptions<'_>,
) -> Result<Arc<CommandInfo>, RegistryError> {
    registrar().register_with(target, options)
}

/// Splits `"a.b.c"` into `(Some("a.b"), "c")` and `"leaf"` into `(None, "leaf")`.
///
/// A name with nothing before its last dot (`".x"`) has no parent and is
/// returned whole.
pub fn split_command_path(name: &str) -> (Option<&str>, &str) {
    match name.rsplit_once('.') {
        Some((parent, leaf)) if !parent.is_empty() => (Some(parent), leaf),
        _ => (None, name),
    }
}

// -------------------------------------------------------------------------------------------------
// Callables
// -------------------------------------------------------------------------------------------------

/// Bookkeeping attached to a [`CommandFn`] once it has been registered.
#[derive(Clone, Debug)]
pub struct CommandStamp {
    pub registered_name: String,
    pub dimension: String,
    pub info: Arc<CommandInfo>,
}

/// A named command callable with optional documentation.
///
/// Clones share their registration stamp, so any copy can report where the
/// command was registered without asking the registry.
#[derive(Clone)]
pub struct CommandFn {
    name: String,
    doc: Option<String>,
    handler: CommandHandler,
    stamp: Arc<RwLock<Option<CommandStamp>>>,
}

impl CommandFn {
    pub fn new(
        name: impl Into<String>,
        handler: impl Fn(&[String]) -> anyhow::Result<()> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            doc: None,
            handler: Arc::new(handler),
            stamp: Arc::default(),
        }
    }

    /// Sets the documentation text, used as the default description.
    pub fn with_doc(mut self, doc: impl AsRef<str>) -> Self {
        let doc = doc.as_ref().trim();
        self.doc = (!doc.is_empty()).then(|| doc.to_owned());
        self
    }

    /// Appends one line of documentation, as produced by `///` comments.
    pub fn with_doc_line(mut self, line: &str) -> Self {
        let line = line.trim();
        match &mut self.doc {
            Some(doc) => {
                doc.push('\n');
                doc.push_str(line);
            }
            None if line.is_empty() => {}
            None => self.doc = Some(line.to_owned()),
        }
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn doc(&self) -> Option<&str> {
        self.doc.as_deref()
    }

    pub fn handler(&self) -> &CommandHandler {
        &self.handler
    }

    pub fn call(&self, args: &[String]) -> anyhow::Result<()> {
        (self.handler)(args)
    }

    /// Where this callable was last registered, if anywhere.
    pub fn registration(&self) -> Option<CommandStamp> {
        self.stamp.read().clone()
    }

    fn stamp(&self, stamp: CommandStamp) {
        *self.stamp.write() = Some(stamp);
    }
}

impl fmt::Debug for CommandFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandFn")
            .field("name", &self.name)
            .field("doc", &self.doc)
            .finish_non_exhaustive()
    }
}

/// A command object produced by an external CLI library that wraps a callable.
pub trait ExternalCommand: Send + Sync {
    /// The wrapped callable.
    fn callback(&self) -> CommandFn;
}

/// Anything [`CommandRegistrar`] accepts as a command.
#[derive(Clone)]
pub enum CommandTarget {
    Function(CommandFn),
    External(Arc<dyn ExternalCommand>),
}

impl CommandTarget {
    pub fn external(command: impl ExternalCommand + 'static) -> Self {
        CommandTarget::External(Arc::new(command))
    }

    /// The underlying callable, unwrapped from any external wrapper.
    pub fn into_callback(self) -> CommandFn {
        match self {
            CommandTarget::Function(callback) => callback,
            CommandTarget::External(command) => command.callback(),
        }
    }
}

impl From<CommandFn> for CommandTarget {
    fn from(callback: CommandFn) -> Self {
        CommandTarget::Function(callback)
    }
}

impl From<Arc<dyn ExternalCommand>> for CommandTarget {
    fn from(command: Arc<dyn ExternalCommand>) -> Self {
        CommandTarget::External(command)
    }
}

// -------------------------------------------------------------------------------------------------
// Command records
// -------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("command '{0}' not found")]
    NotFound(String),
    #[error("command '{0}' is a group and cannot be invoked")]
    NotInvocable(String),
    #[error(transparent)]
    Failed(#[from] anyhow::Error),
}

/// What the `"command"` dimension stores for each command or group.
#[derive(Clone)]
pub struct CommandInfo {
    /// Last segment of the dotted name.
    pub name: String,
    /// Registry key: `parent.name`, or `name` without a parent.
    pub full_name: String,
    /// `None` for synthesized groups.
    pub handler: Option<CommandHandler>,
    pub description: Option<String>,
    pub aliases: Vec<String>,
    pub hidden: bool,
    pub category: Option<String>,
    pub parent: Option<String>,
    pub metadata: Metadata,
}

impl CommandInfo {
    /// A handler-less group node created for a dotted path.
    pub fn group(full_name: &str) -> Self {
        let (parent, name) = split_command_path(full_name);
        let mut metadata = Metadata::new();
        metadata.insert("is_group".into(), json!(true));
        metadata.insert("parent".into(), json!(parent));

        Self {
            name: name.to_owned(),
            full_name: full_name.to_owned(),
            handler: None,
            description: None,
            aliases: Vec::new(),
            hidden: false,
            category: None,
            parent: parent.map(str::to_owned),
            metadata,
        }
    }

    pub fn is_group(&self) -> bool {
        self.metadata
            .get("is_group")
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(false)
    }

    /// Run the handler with `args`.
    pub fn invoke(&self, args: &[String]) -> Result<(), CommandError> {
        let handler = self
            .handler
            .as_ref()
            .ok_or_else(|| CommandError::NotInvocable(self.full_name.clone()))?;
        handler(args)?;
        Ok(())
    }
}

impl fmt::Debug for CommandInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandInfo")
            .field("full_name", &self.full_name)
            .field("description", &self.description)
            .field("aliases", &self.aliases)
            .field("hidden", &self.hidden)
            .field("category", &self.category)
            .field("parent", &self.parent)
            .field("has_handler", &self.handler.is_some())
            .finish()
    }
}

/// Options for [`CommandRegistrar::register_with`].
#[derive(Debug, Clone, Default)]
pub struct CommandOptions<'r> {
    name: Option<String>,
    description: Option<String>,
    aliases: Vec<String>,
    hidden: bool,
    category: Option<String>,
    group: bool,
    replace: bool,
    registry: Option<&'r Registry>,
    metadata: Metadata,
}

impl<'r> CommandOptions<'r> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registered name; dots separate parent groups from the leaf.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    pub fn hidden(mut self, hidden: bool) -> Self {
        self.hidden = hidden;
        self
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Mark the command as a group of subcommands.
    pub fn group(mut self, group: bool) -> Self {
        self.group = group;
        self
    }

    pub fn replace(mut self, replace: bool) -> Self {
        self.replace = replace;
        self
    }

    /// Register into `registry` instead of the registrar's own.
    pub fn registry(mut self, registry: &'r Registry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Extra metadata stored alongside the command.
    pub fn meta(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

// -------------------------------------------------------------------------------------------------
// CLI adapter
// -------------------------------------------------------------------------------------------------

/// Optional bridge to a CLI framework.
pub trait CliAdapter: Send + Sync {
    fn is_available(&self) -> bool {
        true
    }

    /// Make sure every group along the dotted `path` exists in `registry`.
    ///
    /// Must leave existing groups untouched.
    fn ensure_group_chain(&self, path: &str, registry: &Registry) -> Result<(), RegistryError>;
}

/// Adapter that records parent groups as handler-less [`CommandInfo`] entries.
#[derive(Debug, Clone, Copy, Default)]
pub struct GroupAdapter;

impl CliAdapter for GroupAdapter {
    fn ensure_group_chain(&self, path: &str, registry: &Registry) -> Result<(), RegistryError> {
        let lock = registry.shared_lock();
        let _guard = lock.lock();

        let mut end = 0;
        for segment in path.split('.') {
            end += segment.len();
            let prefix = &path[..end];
            end += 1;

            if segment.is_empty() {
                continue;
            }
            if registry.contains((COMMAND_DIMENSION, prefix)) {
                continue;
            }

            let group = CommandInfo::group(prefix);
            let options = RegisterOptions::new()
                .dimension(COMMAND_DIMENSION)
                .metadata(group.metadata.clone());
            registry.register_value(prefix, StoredValue::new(group), options)?;
            tracing::trace!(group = prefix, "created command group");
        }

        Ok(())
    }
}

// -------------------------------------------------------------------------------------------------
// Registrar
// -------------------------------------------------------------------------------------------------

/// Registers commands into a [`Registry`], optionally through a [`CliAdapter`].
#[derive(Clone)]
pub struct CommandRegistrar<'r> {
    registry: &'r Registry,
    adapter: Option<Arc<dyn CliAdapter>>,
}

impl<'r> CommandRegistrar<'r> {
    pub fn new(registry: &'r Registry) -> Self {
        Self {
            registry,
            adapter: None,
        }
    }

    pub fn with_adapter(mut self, adapter: Arc<dyn CliAdapter>) -> Self {
        self.adapter = Some(adapter);
        self
    }

    pub fn registry(&self) -> &'r Registry {
        self.registry
    }

    /// Register `target` under its own name, without a parent group.
    pub fn register(
        &self,
        target: impl Into<CommandTarget>,
    ) -> Result<Arc<CommandInfo>, RegistryError> {
        let callback = target.into().into_callback();
        let name = callback.name().to_owned();
        self.store(callback, None, &name, CommandOptions::new())
    }

    /// Register `target` as described by `options`.
    ///
    /// # Errors
    ///
    /// [`RegistryError::AlreadyExists`] when the full name is taken and
    /// `options` does not request replacement.
    pub fn register_with(
        &self,
        target: impl Into<CommandTarget>,
        options: CommandOptions<'_>,
    ) -> Result<Arc<CommandInfo>, RegistryError> {
        let callback = target.into().into_callback();
        let declared = options
            .name
            .clone()
            .unwrap_or_else(|| callback.name().to_owned());
        let (parent, leaf) = split_command_path(&declared);

        if let Some(parent) = parent {
            let registry = options.registry.unwrap_or(self.registry);
            match &self.adapter {
                Some(adapter) if adapter.is_available() => {
                    adapter.ensure_group_chain(parent, registry)?;
                }
                _ => {}
            }
        }

        self.store(callback, parent, leaf, options)
    }

    fn store(
        &self,
        callback: CommandFn,
        parent: Option<&str>,
        leaf: &str,
        options: CommandOptions<'_>,
    ) -> Result<Arc<CommandInfo>, RegistryError> {
        let CommandOptions {
            description,
            aliases,
            hidden,
            category,
            group,
            replace,
            registry,
            metadata: extra,
            ..
        } = options;
        let registry = registry.unwrap_or(self.registry);

        let full_name = match parent {
            Some(parent) => format!("{parent}.{leaf}"),
            None => leaf.to_owned(),
        };
        let description = description.or_else(|| callback.doc().map(str::to_owned));

        let mut metadata = extra;
        metadata.insert("is_group".into(), json!(group));
        metadata.insert("parent".into(), json!(parent));
        metadata.insert("hidden".into(), json!(hidden));
        metadata.insert("category".into(), json!(category));
        metadata.insert("description".into(), json!(description));
        metadata.insert("aliases".into(), json!(aliases));

        let info = Arc::new(CommandInfo {
            name: leaf.to_owned(),
            full_name: full_name.clone(),
            handler: Some(callback.handler().clone()),
            description,
            aliases: aliases.clone(),
            hidden,
            category,
            parent: parent.map(str::to_owned),
            metadata: metadata.clone(),
        });

        registry.register_value(
            &full_name,
            StoredValue::from_arc(info.clone()),
            RegisterOptions::new()
                .dimension(COMMAND_DIMENSION)
                .metadata(metadata)
                .aliases(aliases)
                .replace(replace),
        )?;

        callback.stamp(CommandStamp {
            registered_name: full_name.clone(),
            dimension: COMMAND_DIMENSION.to_owned(),
            info: info.clone(),
        });
        tracing::trace!(command = %full_name, "registered command");

        Ok(info)
    }

    /// The command or group registered under `name` (full name or alias).
    pub fn get(&self, name: &str) -> Option<Arc<CommandInfo>> {
        self.registry.get_as(name, Some(COMMAND_DIMENSION))
    }

    /// Direct subcommands and subgroups of `parent`, or the top level for `None`.
    pub fn children(&self, parent: Option<&str>) -> Vec<Arc<CommandInfo>> {
        self.registry
            .list_dimension(COMMAND_DIMENSION)
            .iter()
            .filter_map(|name| self.get(name))
            .filter(|info| info.parent.as_deref() == parent)
            .collect()
    }

    /// Look up `name` and run it with `args`.
    pub fn invoke(&self, name: &str, args: &[String]) -> Result<(), CommandError> {
        let info = self
            .get(name)
            .ok_or_else(|| CommandError::NotFound(name.to_owned()))?;
        info.invoke(args)
    }
}

impl fmt::Debug for CommandRegistrar<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandRegistrar")
            .field("registry", &self.registry.config().label)
            .field("adapter", &self.adapter.is_some())
            .finish()
    }
}

// -------------------------------------------------------------------------------------------------
// Tests
// -------------------------------------------------------------------------------------------------
