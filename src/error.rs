use thiserror::Error;

/// Top-level error type for the beamcsg kernel.
#[derive(Debug, Error)]
pub enum BeamcsgError {
    #[error(transparent)]
    Geometry(#[from] GeometryError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Cell(#[from] CellError),

    #[error(transparent)]
    Zone(#[from] ZoneError),

    #[error(transparent)]
    Component(#[from] ComponentError),

    #[error(transparent)]
    Variable(#[from] VariableError),
}

/// Errors related to surface and point geometry.
#[derive(Debug, Error)]
pub enum GeometryError {
    #[error("degenerate geometry: {0}")]
    Degenerate(String),

    #[error("zero-length vector")]
    ZeroVector,
}

/// Errors raised while reading a serialized boolean rule.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("unexpected character '{found}' at position {position}")]
    UnexpectedChar { position: usize, found: char },

    #[error("unbalanced parenthesis at position {position}")]
    UnbalancedParen { position: usize },

    #[error("invalid surface number '{token}' at position {position}")]
    InvalidNumber { position: usize, token: String },

    #[error("surface number zero at position {position}")]
    ZeroSurface { position: usize },

    #[error("complement '#' must be followed by '(' at position {position}")]
    BareComplement { position: usize },
}

/// Errors related to the surface and name registries.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("name already registered: {0}")]
    DuplicateName(String),

    #[error("name not registered: {0}")]
    NameNotFound(String),

    #[error("component id is not live in the arena")]
    StaleComponent,

    #[error("surface number {0} already registered")]
    DuplicateSurface(i32),

    #[error("surface {0} not found")]
    SurfaceNotFound(i32),

    #[error("no surface blocks left to reserve")]
    BlocksExhausted,
}

/// Errors related to cell bookkeeping.
#[derive(Debug, Error)]
pub enum CellError {
    #[error("cell {0} already exists")]
    DuplicateCell(u32),

    #[error("cell {0} not found")]
    CellNotFound(u32),

    #[error("cell {0} was observed by a consumer and can no longer be retrofitted")]
    RetrofitAfterObservation(u32),

    #[error("cell {0} is committed")]
    Committed(u32),
}

/// Errors raised by the zone sequencing state machine.
#[derive(Debug, Error)]
pub enum ZoneError {
    #[error("zone {zone}: expected state {expected}, found {found}")]
    InvalidState {
        zone: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("zone {zone}: '{tag}' has already been carved")]
    AlreadyCarved { zone: String, tag: String },

    #[error("zone {zone}: invalid partition: {reason}")]
    InvalidPartition { zone: String, reason: String },

    #[error("zone {zone}: link '{link}' lies {distance} behind the current divider")]
    BackwardStep {
        zone: String,
        link: String,
        distance: f64,
    },
}

/// Errors related to component wiring and lookups.
#[derive(Debug, Error)]
pub enum ComponentError {
    #[error("component {component} does not provide capability {capability}")]
    MissingCapability {
        component: String,
        capability: &'static str,
    },

    #[error("component {component}: {kind} index {index} out of range (len {len})")]
    IndexOutOfRange {
        component: String,
        kind: &'static str,
        index: usize,
        len: usize,
    },

    #[error("component {component}: no link point named '{link}'")]
    LinkNotFound { component: String, link: String },

    #[error("component {component}: no {kind} named '{tag}'")]
    TagNotFound {
        component: String,
        kind: &'static str,
        tag: String,
    },

    #[error("component {component}: {kind} '{tag}' already registered")]
    DuplicateTag {
        component: String,
        kind: &'static str,
        tag: String,
    },

    #[error("component {component}: {reason}")]
    InvalidInput { component: String, reason: String },
}

/// Errors raised by the variable database.
#[derive(Debug, Error)]
pub enum VariableError {
    #[error("missing variable: {0}")]
    Missing(String),

    #[error("variable {name} is not a {expected}")]
    TypeMismatch { name: String, expected: &'static str },
}

/// Convenience type alias for results using [`BeamcsgError`].
pub type Result<T> = std::result::Result<T, BeamcsgError>;
