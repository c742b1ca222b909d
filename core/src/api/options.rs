//! Configuration options for the exprel engine.

use core::fmt;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, FixedOffset, Local, NaiveDateTime, Offset, TimeZone, Utc};
use ecow::EcoString;
use hashbrown::HashSet;

use super::environment::Environment;
use crate::parser::DEFAULT_MAX_DEPTH;
use crate::types::Kind;
use crate::values::Function;
use crate::visitor::Visitor;
use crate::vm::DEFAULT_MEMORY_BUDGET;

/// Instructions between two cancellation checks.
pub const DEFAULT_CHECK_INTERVAL: u32 = 4096;

// ============================================================================
// Timezone
// ============================================================================

/// Zone used by `now()` and by `date()` when the input carries no offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Timezone {
    #[default]
    Utc,
    /// The zone of the host process.
    Local,
    Fixed(FixedOffset),
}

impl Timezone {
    /// Parses `UTC`, `Local` or a fixed offset such as `+05:30` / `-0800`.
    ///
    /// ```
    /// use exprel_core::api::Timezone;
    ///
    /// assert_eq!(Timezone::parse("utc"), Some(Timezone::Utc));
    /// assert!(matches!(Timezone::parse("+02:00"), Some(Timezone::Fixed(_))));
    /// assert_eq!(Timezone::parse("Mars/Olympus"), None);
    /// ```
    pub fn parse(name: &str) -> Option<Self> {
        let name = name.trim();
        if name.eq_ignore_ascii_case("utc") || name == "Z" {
            return Some(Timezone::Utc);
        }
        if name.eq_ignore_ascii_case("local") {
            return Some(Timezone::Local);
        }
        parse_offset(name).map(Timezone::Fixed)
    }

    pub fn offset_at(&self, instant: &DateTime<Utc>) -> FixedOffset {
        match self {
            Timezone::Utc => Utc.fix(),
            Timezone::Local => Local.offset_from_utc_datetime(&instant.naive_utc()).fix(),
            Timezone::Fixed(offset) => *offset,
        }
    }

    pub fn now(&self) -> DateTime<FixedOffset> {
        let now = Utc::now();
        now.with_timezone(&self.offset_at(&now))
    }

    /// Interprets a wall-clock time in this zone.
    pub fn localize(&self, naive: &NaiveDateTime) -> Option<DateTime<FixedOffset>> {
        match self {
            Timezone::Utc => Some(Utc.from_utc_datetime(naive).fixed_offset()),
            Timezone::Local => Local
                .from_local_datetime(naive)
                .earliest()
                .map(|t| t.fixed_offset()),
            Timezone::Fixed(offset) => offset.from_local_datetime(naive).single(),
        }
    }
}

impl fmt::Display for Timezone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Timezone::Utc => f.write_str("UTC"),
            Timezone::Local => f.write_str("Local"),
            Timezone::Fixed(offset) => write!(f, "{}", offset),
        }
    }
}

fn parse_offset(text: &str) -> Option<FixedOffset> {
    let (sign, rest) = match text.as_bytes().first()? {
        b'+' => (1, &text[1..]),
        b'-' => (-1, &text[1..]),
        _ => return None,
    };
    let digits: String = rest.chars().filter(|c| *c != ':').collect();
    if digits.len() != 4 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let hours: i32 = digits[..2].parse().ok()?;
    let minutes: i32 = digits[2..].parse().ok()?;
    if hours > 23 || minutes > 59 {
        return None;
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

// ============================================================================
// Compilation
// ============================================================================

/// Kind the program result must have.
///
/// The numeric variants convert the result; the others only validate the
/// checked nature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expect {
    Any,
    Bool,
    Int,
    Int64,
    Float64,
    String,
    Kind(Kind),
}

/// Produces a fresh patch visitor for every compilation.
pub type PatchFactory = Arc<dyn Fn() -> Box<dyn Visitor> + Send + Sync>;

/// Configuration options for compilation.
///
/// # Example
///
/// ```
/// use exprel_core::api::{CompilationOptions, Expect, MapEnv};
/// use exprel_core::values::Value;
///
/// let env = MapEnv::new().with("Price", Value::Int(10));
/// let options = CompilationOptions::default()
///     .env(env)
///     .expect(Expect::Bool)
///     .optimize(false);
/// assert!(!options.optimize);
/// ```
#[derive(Clone)]
pub struct CompilationOptions {
    /// Environment the program is checked against. Without one every
    /// identifier is accepted with an unknown type.
    pub env: Option<Arc<dyn Environment>>,
    pub expect: Expect,
    /// Unknown identifiers evaluate to `nil` instead of failing the check.
    pub allow_undefined: bool,
    /// Runs the optimizer. Default: `true`.
    pub optimize: bool,
    /// Operator lexeme to the names of the functions overloading it.
    pub operators: BTreeMap<EcoString, Vec<EcoString>>,
    /// Functions visible to the program besides the environment's own.
    pub functions: BTreeMap<EcoString, Function>,
    /// Functions the optimizer may evaluate at compile time.
    pub const_exprs: HashSet<EcoString>,
    pub patches: Vec<PatchFactory>,
    pub timezone: Timezone,
    pub disabled_builtins: HashSet<EcoString>,
    /// Parser nesting limit.
    pub max_depth: usize,
}

impl Default for CompilationOptions {
    fn default() -> Self {
        Self {
            env: None,
            expect: Expect::Any,
            allow_undefined: false,
            optimize: true,
            operators: BTreeMap::new(),
            functions: BTreeMap::new(),
            const_exprs: HashSet::new(),
            patches: Vec::new(),
            timezone: Timezone::Utc,
            disabled_builtins: HashSet::new(),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl CompilationOptions {
    pub fn env(mut self, env: impl Environment + 'static) -> Self {
        self.env = Some(Arc::new(env));
        self
    }

    pub fn shared_env(mut self, env: Arc<dyn Environment>) -> Self {
        self.env = Some(env);
        self
    }

    pub fn expect(mut self, expect: Expect) -> Self {
        self.expect = expect;
        self
    }

    pub fn allow_undefined_variables(mut self) -> Self {
        self.allow_undefined = true;
        self
    }

    pub fn optimize(mut self, optimize: bool) -> Self {
        self.optimize = optimize;
        self
    }

    /// Overloads `op` with the named functions, tried in order.
    ///
    /// ```
    /// use exprel_core::api::CompilationOptions;
    ///
    /// let options = CompilationOptions::default().operator("+", ["AddVec"]);
    /// assert_eq!(options.operators["+"].len(), 1);
    /// ```
    pub fn operator<I, S>(mut self, op: &str, functions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<EcoString>,
    {
        self.operators
            .entry(op.into())
            .or_default()
            .extend(functions.into_iter().map(Into::into));
        self
    }

    pub fn function(mut self, function: Function) -> Self {
        self.functions.insert(function.name.clone(), function);
        self
    }

    pub fn const_expr(mut self, name: impl Into<EcoString>) -> Self {
        self.const_exprs.insert(name.into());
        self
    }

    /// Runs `visitor` over the parsed tree before checking. Each compilation
    /// uses its own clone.
    pub fn patch<V>(mut self, visitor: V) -> Self
    where
        V: Visitor + Clone + Send + Sync + 'static,
    {
        self.patches
            .push(Arc::new(move || Box::new(visitor.clone()) as Box<dyn Visitor>));
        self
    }

    pub fn timezone(mut self, timezone: Timezone) -> Self {
        self.timezone = timezone;
        self
    }

    pub fn disable_builtin(mut self, name: impl Into<EcoString>) -> Self {
        self.disabled_builtins.insert(name.into());
        self
    }

    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }
}

impl fmt::Debug for CompilationOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompilationOptions")
            .field("env", &self.env.is_some())
            .field("expect", &self.expect)
            .field("allow_undefined", &self.allow_undefined)
            .field("optimize", &self.optimize)
            .field("operators", &self.operators)
            .field("functions", &self.functions.keys().collect::<Vec<_>>())
            .field("const_exprs", &self.const_exprs)
            .field("patches", &self.patches.len())
            .field("timezone", &self.timezone)
            .field("disabled_builtins", &self.disabled_builtins)
            .finish()
    }
}

// ============================================================================
// Execution
// ============================================================================

/// Shared flag a host sets to stop a running program.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Configuration options for expression execution.
///
/// These options control resource limits during evaluation.
///
/// # Example
///
/// ```
/// use exprel_core::api::{CancellationToken, ExecutionOptions};
///
/// let token = CancellationToken::new();
/// let options = ExecutionOptions {
///     memory_budget: 10_000,
///     cancellation: Some(token.clone()),
///     ..Default::default()
/// };
/// assert_eq!(options.check_interval, 4096);
/// ```
#[derive(Debug, Clone)]
pub struct ExecutionOptions {
    /// Maximum number of container elements a run may allocate.
    ///
    /// Default: 1_000_000
    pub memory_budget: usize,

    pub cancellation: Option<CancellationToken>,

    /// Instructions executed between cancellation checks. Backward jumps
    /// check as well.
    ///
    /// Default: 4096
    pub check_interval: u32,
}

impl Default for ExecutionOptions {
    fn default() -> Self {
        Self {
            memory_budget: DEFAULT_MEMORY_BUDGET,
            cancellation: None,
            check_interval: DEFAULT_CHECK_INTERVAL,
        }
    }
}

/// Configuration options for the exprel engine.
///
/// These options set the defaults for compilation and execution,
/// which can be overridden on a per-call basis.
///
/// # Example
///
/// ```
/// use exprel_core::api::{CompilationOptions, EngineOptions, ExecutionOptions};
///
/// let options = EngineOptions {
///     default_compilation_options: CompilationOptions::default().optimize(false),
///     default_execution_options: ExecutionOptions {
///         memory_budget: 500,
///         ..Default::default()
///     },
/// };
/// assert_eq!(options.default_execution_options.memory_budget, 500);
/// ```
#[derive(Debug, Clone, Default)]
pub struct EngineOptions {
    /// Default options for compilation.
    ///
    /// These can be overridden when calling `Engine::compile_with()`.
    pub default_compilation_options: CompilationOptions,

    /// Default options for execution.
    ///
    /// These can be overridden when calling `CompiledExpression::run_with()`.
    pub default_execution_options: ExecutionOptions,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_fixed_offsets() {
        let east = FixedOffset::east_opt(5 * 3600 + 30 * 60).unwrap();
        assert_eq!(Timezone::parse("+05:30"), Some(Timezone::Fixed(east)));
        assert_eq!(Timezone::parse("+0530"), Some(Timezone::Fixed(east)));
        let west = FixedOffset::west_opt(8 * 3600).unwrap();
        assert_eq!(Timezone::parse("-08:00"), Some(Timezone::Fixed(west)));
        assert_eq!(Timezone::parse("+25:00"), None);
        assert_eq!(Timezone::parse("0800"), None);
    }

    #[test]
    fn test_localize_fixed() {
        let tz = Timezone::parse("+02:00").unwrap();
        let naive = NaiveDateTime::parse_from_str("2024-03-01 12:00:00", "%Y-%m-%d %H:%M:%S")
            .unwrap();
        let t = tz.localize(&naive).unwrap();
        assert_eq!(t.to_rfc3339(), "2024-03-01T12:00:00+02:00");
    }

    #[test]
    fn test_now_uses_zone_offset() {
        let tz = Timezone::parse("-03:00").unwrap();
        assert_eq!(tz.now().offset().local_minus_utc(), -3 * 3600);
        assert_eq!(Timezone::Utc.now().offset().local_minus_utc(), 0);
    }

    #[test]
    fn test_cancellation_token_is_shared() {
        let token = CancellationToken::new();
        let copy = token.clone();
        assert!(!copy.is_cancelled());
        token.cancel();
        assert!(copy.is_cancelled());
    }

    #[test]
    fn test_operator_accumulates() {
        let options = CompilationOptions::default()
            .operator("+", ["A"])
            .operator("+", ["B"]);
        let expected: Vec<EcoString> = vec!["A".into(), "B".into()];
        assert_eq!(options.operators["+"], expected);
    }
}
