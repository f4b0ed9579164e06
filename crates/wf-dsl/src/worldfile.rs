use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};

use log::{debug, warn};
use wf_core::value::{format_float, parse_color, parse_float, parse_int};
use wf_core::{
    AngleUnit, Anchor, EntityId, EntityStore, LengthUnit, MacroId, MacroTable, Property,
    PropertyId, Token, TokenId, TokenSeq, UnitTable, WfError, WfResult,
};

use crate::config::LoadConfig;
use crate::diagnostics::Diagnostic;
use crate::edit::{self, NewValue};
use crate::error::{LoadError, SaveError};
use crate::loader::Loader;
use crate::parser;
use crate::save;
use crate::source::SourceMap;

/// A loaded worldfile: its tokens, entities, properties, and macros, plus the
/// typed accessors used to read and edit it.
///
/// Entity 0 always exists and holds the top-level properties. Every instance is
/// independent; nothing is shared between two `WorldFile`s.
#[derive(Debug)]
pub struct WorldFile {
    config: LoadConfig,
    filename: Option<PathBuf>,
    tokens: TokenSeq,
    store: EntityStore,
    macros: MacroTable,
    units: UnitTable,
    sources: SourceMap,
    diagnostics: Vec<Diagnostic>,
    model_types: HashMap<String, EntityId>,
}

impl Default for WorldFile {
    fn default() -> Self {
        Self::new()
    }
}

impl WorldFile {
    /// An empty worldfile with default settings.
    pub fn new() -> Self {
        Self::with_config(LoadConfig::default())
    }

    /// An empty worldfile that will load with `config`.
    pub fn with_config(config: LoadConfig) -> Self {
        let mut wf = Self {
            config,
            filename: None,
            tokens: TokenSeq::new(),
            store: EntityStore::new(),
            macros: MacroTable::new(),
            units: UnitTable::default(),
            sources: SourceMap::new(),
            diagnostics: Vec::new(),
            model_types: HashMap::new(),
        };
        wf.reset();
        wf
    }

    fn reset(&mut self) {
        self.filename = None;
        self.tokens.clear();
        self.store.clear();
        self.macros.clear();
        self.units = UnitTable::default();
        self.sources.clear();
        self.diagnostics.clear();
        self.model_types.clear();

        let global = self
            .store
            .create_entity(None, "", "")
            .ok()
            .and_then(|id| self.store.entity_mut(id));
        if let Some(global) = global {
            global.anchor = Anchor::EndOfFile;
        }
    }

    // -----------------------------------------------------------------------
    // Load / save
    // -----------------------------------------------------------------------

    /// Load a worldfile, replacing whatever was loaded before.
    ///
    /// A relative `path` is looked up in the configured search directories, then
    /// relative to the working directory. On a lex or parse error the error is
    /// also recorded in [`diagnostics`](Self::diagnostics) and everything parsed
    /// before it stays available.
    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<(), LoadError> {
        self.reset();
        let path = path.as_ref();
        let Some(resolved) = self.config.resolve(path, None) else {
            let err = LoadError::NotFound(path.to_path_buf());
            self.diagnostics.push(Diagnostic::error(err.to_string()));
            return Err(err);
        };
        let resolved = std::path::absolute(&resolved).unwrap_or(resolved);
        debug!("loading {}", resolved.display());

        self.filename = Some(resolved.clone());
        let loaded = Loader::new(&self.config, &mut self.sources).load_file(&resolved, &mut self.tokens);
        self.finish_load(&resolved, loaded)
    }

    /// Load worldfile text that did not come from disk. `path` names it in
    /// messages, is the default save target, and anchors relative includes and
    /// filenames.
    pub fn load_source(
        &mut self,
        text: impl Into<String>,
        path: impl AsRef<Path>,
    ) -> Result<(), LoadError> {
        self.reset();
        let path = path.as_ref().to_path_buf();
        self.filename = Some(path.clone());
        let loaded =
            Loader::new(&self.config, &mut self.sources).load_source(&path, text.into(), &mut self.tokens);
        self.finish_load(&path, loaded)
    }

    fn finish_load(&mut self, path: &Path, loaded: Result<(), LoadError>) -> Result<(), LoadError> {
        if let Err(err) = loaded {
            let diag = match &err {
                LoadError::Lex {
                    file,
                    line,
                    span,
                    message,
                    ..
                } => Diagnostic::error(message.clone()).at(*file, *line, span.clone()),
                other => Diagnostic::error(other.to_string()),
            };
            self.diagnostics.push(diag);
            return Err(err);
        }

        let parsed = parser::parse(
            self.tokens.as_slice(),
            &mut self.store,
            &mut self.macros,
            &self.config,
        );
        if let Err(error) = parsed {
            let (file, span) = self.token_location(error.token);
            self.diagnostics
                .push(Diagnostic::error(error.message.clone()).at(file, error.line, span));
            return Err(LoadError::Parse {
                path: path.to_path_buf(),
                error,
            });
        }

        self.units = self.read_units();
        debug!(
            "loaded {}: {} tokens, {} entities, {} properties, {} macros",
            path.display(),
            self.tokens.layout_len(),
            self.store.entity_count(),
            self.store.property_count(),
            self.macros.len()
        );
        Ok(())
    }

    fn read_units(&mut self) -> UnitTable {
        let length = self.read_string(EntityId::GLOBAL, "unit_length", LengthUnit::default().name());
        let length = length.parse::<LengthUnit>().unwrap_or_else(|err| {
            self.unit_warning("unit_length", &err);
            LengthUnit::default()
        });
        let angle = self.read_string(EntityId::GLOBAL, "unit_angle", AngleUnit::default().name());
        let angle = angle.parse::<AngleUnit>().unwrap_or_else(|err| {
            self.unit_warning("unit_angle", &err);
            AngleUnit::default()
        });
        UnitTable::new(length, angle)
    }

    fn unit_warning(&mut self, name: &str, err: &WfError) {
        if let Some(prop) = self.store.lookup_property(EntityId::GLOBAL, name) {
            self.value_warning(prop, 0, err);
        }
    }

    /// Write the top-level file (not its includes) to `path`, or back to the
    /// loaded file when `path` is `None`.
    pub fn save(&self, path: Option<&Path>) -> Result<(), SaveError> {
        let target = path
            .or(self.filename.as_deref())
            .ok_or(SaveError::NoFilename)?;
        save::write_atomic(target, &self.render())
    }

    /// The text [`save`](Self::save) would write.
    pub fn render(&self) -> String {
        save::render(&self.tokens)
    }

    // -----------------------------------------------------------------------
    // Introspection
    // -----------------------------------------------------------------------

    /// The loaded file, if any.
    pub fn filename(&self) -> Option<&Path> {
        self.filename.as_deref()
    }

    /// Active unit factors.
    pub fn units(&self) -> UnitTable {
        self.units
    }

    /// Errors and warnings collected since the last load.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Every file read during the last load.
    pub fn sources(&self) -> &SourceMap {
        &self.sources
    }

    /// The entity/property store.
    pub fn store(&self) -> &EntityStore {
        &self.store
    }

    /// The macro table.
    pub fn macros(&self) -> &MacroTable {
        &self.macros
    }

    /// Tokens in on-disk order, including those spliced in from includes.
    pub fn tokens(&self) -> impl Iterator<Item = &Token> + '_ {
        self.tokens.layout().map(|(_, t)| t)
    }

    /// Look up a token by id.
    pub fn token(&self, id: TokenId) -> Option<&Token> {
        self.tokens.get(id)
    }

    /// Number of entities, including the global entity.
    pub fn entity_count(&self) -> usize {
        self.store.entity_count()
    }

    /// Base type of an entity (macros resolved).
    pub fn entity_type(&self, entity: EntityId) -> Option<&str> {
        self.store.base_type(entity)
    }

    /// Type name as written, which may be a macro name.
    pub fn entity_immediate_type(&self, entity: EntityId) -> Option<&str> {
        self.store.immediate_type(entity)
    }

    /// Parent of an entity; `None` for entity 0 and other roots.
    pub fn entity_parent(&self, entity: EntityId) -> Option<EntityId> {
        self.store.parent_of(entity)
    }

    /// Line the entity's type name appears on. 0 for synthesized entities.
    pub fn entity_line(&self, entity: EntityId) -> Option<usize> {
        self.store.entity(entity).map(|e| e.line)
    }

    /// Next child of `parent` after `after`, or the first child when `after` is
    /// `None`.
    pub fn next_child_entity(
        &self,
        parent: Option<EntityId>,
        after: Option<EntityId>,
    ) -> Option<EntityId> {
        self.store.next_child(parent, after)
    }

    /// Children of `parent` in creation order.
    pub fn children(&self, parent: Option<EntityId>) -> impl Iterator<Item = EntityId> + '_ {
        self.store.children_of(parent)
    }

    /// First entity with the given base type.
    pub fn lookup_entity(&self, entity_type: &str) -> Option<EntityId> {
        self.store.lookup_entity(entity_type)
    }

    /// The macro currently bound to `name`.
    pub fn lookup_macro(&self, name: &str) -> Option<MacroId> {
        self.macros.lookup(name)
    }

    /// Name of a macro.
    pub fn macro_name(&self, id: MacroId) -> Option<&str> {
        self.macros.get(id).map(|m| m.name.as_str())
    }

    /// The type a macro is defined in terms of.
    pub fn macro_entity_type(&self, id: MacroId) -> Option<&str> {
        self.macros.get(id).map(|m| m.entity_type.as_str())
    }

    /// A property of an entity.
    pub fn property(&self, entity: EntityId, name: &str) -> Option<&Property> {
        self.store
            .lookup_property(entity, name)
            .and_then(|id| self.store.property(id))
    }

    /// Total number of properties across all entities.
    pub fn property_count(&self) -> usize {
        self.store.property_count()
    }

    /// Line a property was (last) defined on.
    pub fn property_line(&self, entity: EntityId, name: &str) -> Option<usize> {
        self.property(entity, name).map(|p| p.line)
    }

    // -----------------------------------------------------------------------
    // Model-type registry
    // -----------------------------------------------------------------------

    /// Remember which entity was created for a model type.
    pub fn set_entity_id_for_model_type(&mut self, model_type: impl Into<String>, entity: EntityId) {
        self.model_types.insert(model_type.into(), entity);
    }

    /// The entity previously registered for a model type.
    pub fn find_entity_id_for_model_type(&self, model_type: &str) -> Option<EntityId> {
        self.model_types.get(model_type).copied()
    }

    // -----------------------------------------------------------------------
    // Editing
    // -----------------------------------------------------------------------

    /// Add an empty entity of `entity_type` under `parent` (or as a root).
    ///
    /// The entity is written out as `type ( )` at the end of the parent's body
    /// (or the file), so it survives a save and reload. No macro expansion
    /// takes place. A parent expanded from a macro body has no body of its own
    /// in the file and is refused.
    pub fn create_entity(
        &mut self,
        entity_type: &str,
        parent: Option<EntityId>,
    ) -> WfResult<EntityId> {
        let id = edit::create_entity(&mut self.tokens, &mut self.store, entity_type, parent)
            .inspect_err(|e| warn!("cannot create {entity_type} entity: {e}"))?;
        debug!("created {entity_type} entity {id}");
        Ok(id)
    }

    /// Properties that were defined but never read.
    pub fn unused_properties(&self) -> impl Iterator<Item = &Property> + '_ {
        self.store.unused_properties().map(|(_, p)| p)
    }

    /// Log a warning for every property that was defined but never read.
    /// Returns `true` if there was at least one.
    pub fn warn_unused(&mut self) -> bool {
        let unused: Vec<PropertyId> = self.store.unused_properties().map(|(id, _)| id).collect();
        for &id in &unused {
            let Some(prop) = self.store.property(id) else {
                continue;
            };
            let entity_type = self.store.base_type(prop.owner).unwrap_or_default();
            let message = if prop.owner == EntityId::GLOBAL {
                format!("property \"{}\" is defined but never used", prop.name)
            } else {
                format!(
                    "property \"{}\" of {} entity {} is defined but never used",
                    prop.name, entity_type, prop.owner
                )
            };
            warn!("{}:{}: {message}", self.display_name(), prop.line);

            let (file, span) = self.token_location(prop.name_token);
            self.diagnostics
                .push(Diagnostic::warning(message).at(file, prop.line, span).with_label("unused"));
        }
        !unused.is_empty()
    }

    // -----------------------------------------------------------------------
    // Reading
    // -----------------------------------------------------------------------

    /// Slot `index` of a property, marking the property used. `None` (and
    /// nothing marked) if the property or the slot does not exist.
    fn read_raw(&mut self, entity: EntityId, name: &str, index: usize) -> Option<(PropertyId, String)> {
        let prop = self.store.lookup_property(entity, name)?;
        let token = self.store.property(prop)?.value(index)?;
        let text = self.tokens.text(token)?.to_string();
        self.store.mark_used(prop);
        Some((prop, text))
    }

    fn read_parsed<T>(
        &mut self,
        entity: EntityId,
        name: &str,
        index: usize,
        default: T,
        parse: impl FnOnce(&str) -> WfResult<T>,
    ) -> T {
        let Some((prop, text)) = self.read_raw(entity, name, index) else {
            return default;
        };
        match parse(&text) {
            Ok(value) => value,
            Err(err) => {
                self.value_warning(prop, index, &err);
                default
            }
        }
    }

    fn value_warning(&mut self, prop: PropertyId, index: usize, err: &WfError) {
        let Some(p) = self.store.property(prop) else {
            return;
        };
        let message = format!("{}[{index}]: {err}", p.name);
        warn!("{}:{}: {message}", self.display_name(), p.line);
        let (file, span) = self.token_location(p.value(index));
        let line = p.line;
        self.diagnostics
            .push(Diagnostic::warning(message).at(file, line, span));
    }

    /// Read a string.
    pub fn read_string(&mut self, entity: EntityId, name: &str, default: &str) -> String {
        self.read_tuple_string(entity, name, 0, default)
    }

    /// Read an integer.
    pub fn read_int(&mut self, entity: EntityId, name: &str, default: i64) -> i64 {
        self.read_tuple_int(entity, name, 0, default)
    }

    /// Read a float.
    pub fn read_float(&mut self, entity: EntityId, name: &str, default: f64) -> f64 {
        self.read_tuple_float(entity, name, 0, default)
    }

    /// Read a length in meters.
    pub fn read_length(&mut self, entity: EntityId, name: &str, default: f64) -> f64 {
        self.read_tuple_length(entity, name, 0, default)
    }

    /// Read an angle in radians.
    pub fn read_angle(&mut self, entity: EntityId, name: &str, default: f64) -> f64 {
        self.read_tuple_angle(entity, name, 0, default)
    }

    /// Read a color as `0xRRGGBB`. Accepts the named colors and `#RRGGBB`.
    pub fn read_color(&mut self, entity: EntityId, name: &str, default: u32) -> u32 {
        self.read_parsed(entity, name, 0, default, parse_color)
    }

    /// Read a filename as an absolute path. Relative values are resolved against
    /// the directory of the loaded worldfile. The default is returned unchanged.
    pub fn read_filename(&mut self, entity: EntityId, name: &str, default: &str) -> PathBuf {
        match self.read_raw(entity, name, 0) {
            Some((_, text)) => self.resolve_filename(&text),
            None => PathBuf::from(default),
        }
    }

    /// Read slot `index` of a tuple as a string.
    pub fn read_tuple_string(
        &mut self,
        entity: EntityId,
        name: &str,
        index: usize,
        default: &str,
    ) -> String {
        self.read_raw(entity, name, index)
            .map_or_else(|| default.to_string(), |(_, text)| text)
    }

    /// Read slot `index` of a tuple as an integer.
    pub fn read_tuple_int(&mut self, entity: EntityId, name: &str, index: usize, default: i64) -> i64 {
        self.read_parsed(entity, name, index, default, parse_int)
    }

    /// Read slot `index` of a tuple as a float.
    pub fn read_tuple_float(
        &mut self,
        entity: EntityId,
        name: &str,
        index: usize,
        default: f64,
    ) -> f64 {
        self.read_parsed(entity, name, index, default, parse_float)
    }

    /// Read slot `index` of a tuple as a length in meters.
    pub fn read_tuple_length(
        &mut self,
        entity: EntityId,
        name: &str,
        index: usize,
        default: f64,
    ) -> f64 {
        let units = self.units;
        self.read_parsed(entity, name, index, default, |text| {
            parse_float(text).map(|raw| units.length_from_file(raw))
        })
    }

    /// Read slot `index` of a tuple as an angle in radians.
    pub fn read_tuple_angle(
        &mut self,
        entity: EntityId,
        name: &str,
        index: usize,
        default: f64,
    ) -> f64 {
        let units = self.units;
        self.read_parsed(entity, name, index, default, |text| {
            parse_float(text).map(|raw| units.angle_from_file(raw))
        })
    }

    // -----------------------------------------------------------------------
    // Writing
    // -----------------------------------------------------------------------

    /// Write a string.
    pub fn write_string(&mut self, entity: EntityId, name: &str, value: &str) -> WfResult<()> {
        self.write_tuple_string(entity, name, 0, value)
    }

    /// Write an integer.
    pub fn write_int(&mut self, entity: EntityId, name: &str, value: i64) -> WfResult<()> {
        self.write_tuple_int(entity, name, 0, value)
    }

    /// Write a float.
    pub fn write_float(&mut self, entity: EntityId, name: &str, value: f64) -> WfResult<()> {
        self.write_tuple_float(entity, name, 0, value)
    }

    /// Write a length given in meters.
    pub fn write_length(&mut self, entity: EntityId, name: &str, value: f64) -> WfResult<()> {
        self.write_tuple_length(entity, name, 0, value)
    }

    /// Write an angle given in radians.
    pub fn write_angle(&mut self, entity: EntityId, name: &str, value: f64) -> WfResult<()> {
        self.write_tuple_angle(entity, name, 0, value)
    }

    /// Write slot `index` as a string.
    ///
    /// Quotes and line breaks cannot be represented inside a worldfile string
    /// and are dropped.
    pub fn write_tuple_string(
        &mut self,
        entity: EntityId,
        name: &str,
        index: usize,
        value: &str,
    ) -> WfResult<()> {
        let clean: String = value.chars().filter(|c| !matches!(c, '"' | '\n')).collect();
        if clean.len() != value.len() {
            warn!("dropping quotes and line breaks from value of \"{name}\": {value:?}");
        }
        self.write(entity, name, index, NewValue::string(clean))
    }

    /// Write slot `index` as an integer.
    pub fn write_tuple_int(
        &mut self,
        entity: EntityId,
        name: &str,
        index: usize,
        value: i64,
    ) -> WfResult<()> {
        self.write(entity, name, index, NewValue::number(value.to_string()))
    }

    /// Write slot `index` as a float.
    pub fn write_tuple_float(
        &mut self,
        entity: EntityId,
        name: &str,
        index: usize,
        value: f64,
    ) -> WfResult<()> {
        self.write_number(entity, name, index, value)
    }

    /// Write slot `index` as a length given in meters.
    pub fn write_tuple_length(
        &mut self,
        entity: EntityId,
        name: &str,
        index: usize,
        value: f64,
    ) -> WfResult<()> {
        let raw = self.units.length_to_file(value);
        self.write_number(entity, name, index, raw)
    }

    /// Write slot `index` as an angle given in radians.
    pub fn write_tuple_angle(
        &mut self,
        entity: EntityId,
        name: &str,
        index: usize,
        value: f64,
    ) -> WfResult<()> {
        let raw = self.units.angle_to_file(value);
        self.write_number(entity, name, index, raw)
    }

    /// Infinity and NaN have no spelling the lexer would read back.
    fn write_number(&mut self, entity: EntityId, name: &str, index: usize, raw: f64) -> WfResult<()> {
        if !raw.is_finite() {
            return Err(WfError::NonFinite {
                name: name.to_string(),
                value: raw,
            });
        }
        self.write(entity, name, index, NewValue::number(format_float(raw)))
    }

    fn write(&mut self, entity: EntityId, name: &str, index: usize, value: NewValue) -> WfResult<()> {
        let written = edit::write_value(&mut self.tokens, &mut self.store, entity, name, index, value);
        if let Err(WfError::MacroBodyEntity(id)) = &written {
            warn!("\"{name}\" not written: entity {id} was expanded from a macro body");
        }
        written
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn display_name(&self) -> String {
        self.filename
            .as_deref()
            .map_or_else(|| "<worldfile>".to_string(), |p| p.display().to_string())
    }

    fn token_location(&self, token: Option<TokenId>) -> (Option<usize>, std::ops::Range<usize>) {
        token
            .and_then(|id| self.tokens.get(id))
            .and_then(|t| t.origin.as_ref())
            .map_or((None, 0..0), |o| (Some(o.file), o.span.clone()))
    }

    fn resolve_filename(&self, value: &str) -> PathBuf {
        let path = Path::new(value);
        if path.is_absolute() || value.starts_with('~') {
            return path.to_path_buf();
        }
        let joined = match self.filename.as_deref().and_then(Path::parent) {
            Some(dir) => dir.join(path),
            None => path.to_path_buf(),
        };
        normalize(&std::path::absolute(&joined).unwrap_or(joined))
    }
}

/// Drop `.` components and fold `..` into its parent without touching the
/// filesystem.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push(component);
                }
            }
            other => out.push(other),
        }
    }
    out
}
