mod highlighter;
mod lexer;

use std::io::{BufRead, BufReader};
use std::sync::Arc;

use clap::Parser;
use exprel::{
    CompilationOptions, Environment, ExecutionOptions, Expect, MapEnv, Timezone, render_error,
};
use exprel_core::{builtins, parser};
use miette::{IntoDiagnostic, Result, miette};
use reedline::{
    DefaultCompleter, DefaultPrompt, DefaultPromptSegment, DescriptionMode, EditCommand, Emacs,
    FileBackedHistory, IdeMenu, KeyCode, KeyModifiers, Keybindings, MenuBuilder, Reedline,
    ReedlineEvent, ReedlineMenu, Signal, ValidationResult, Validator, default_emacs_keybindings,
};
use tracing::debug;

use crate::highlighter::Highlighter;

/// exprel - a safe, fast, embeddable expression language
#[derive(Parser, Debug)]
#[command(name = "exprel")]
#[command(about = "Evaluate exprel expressions", long_about = None)]
struct Args {
    /// Define a variable, e.g. `--var 'xs=[1, 2, 3]'`. The value is itself
    /// an expression.
    #[arg(short = 'v', long = "var", value_name = "NAME=EXPR")]
    vars: Vec<String>,

    /// Check undeclared names as unknown and evaluate them to nil
    #[arg(long)]
    lenient: bool,

    /// Convert the result (int, int64, float64) or check its kind (bool, string)
    #[arg(long, value_name = "KIND")]
    expect: Option<String>,

    /// Zone for `now()` and offset-less dates: UTC, Local or +HH:MM
    #[arg(long, value_name = "ZONE")]
    timezone: Option<String>,

    /// Maximum number of container elements a run may allocate
    #[arg(long, value_name = "N")]
    memory_budget: Option<usize>,

    /// Skip the optimizer
    #[arg(long)]
    no_optimize: bool,

    /// Print the parsed tree (for debugging)
    #[arg(long)]
    debug_parse: bool,

    /// Print the compiled bytecode (for debugging)
    #[arg(long)]
    disassemble: bool,

    /// Expression to evaluate (if not provided, reads from stdin)
    expression: Option<String>,
}

/// Everything one input line is compiled and run with.
struct Session {
    env: Arc<MapEnv>,
    options: CompilationOptions,
    execution: ExecutionOptions,
    debug_parse: bool,
    disassemble: bool,
}

impl Session {
    fn from_args(args: &Args) -> Result<Self> {
        let mut env = MapEnv::new();
        for var in &args.vars {
            let (name, expr) = var
                .split_once('=')
                .ok_or_else(|| miette!("expected NAME=EXPR, got {:?}", var))?;
            let value = exprel::eval(expr, env.clone()).map_err(|err| {
                render_error(&err);
                miette!("invalid value for variable {}", name.trim())
            })?;
            env.insert(name.trim(), value);
        }
        if args.lenient {
            env = env.lenient();
        }
        let env = Arc::new(env);

        let mut options = CompilationOptions::default()
            .shared_env(env.clone() as Arc<dyn Environment>)
            .optimize(!args.no_optimize);
        if let Some(expect) = &args.expect {
            options = options.expect(parse_expect(expect)?);
        }
        if let Some(zone) = &args.timezone {
            let zone =
                Timezone::parse(zone).ok_or_else(|| miette!("unknown time zone {:?}", zone))?;
            options = options.timezone(zone);
        }
        if args.lenient {
            options = options.allow_undefined_variables();
        }

        let mut execution = ExecutionOptions::default();
        if let Some(budget) = args.memory_budget {
            execution.memory_budget = budget;
        }
        debug!(vars = env.len(), optimize = options.optimize, "session ready");

        Ok(Self {
            env,
            options,
            execution,
            debug_parse: args.debug_parse,
            disassemble: args.disassemble,
        })
    }

    fn interpret(&self, input: &str) {
        if input.trim().is_empty() {
            return;
        }

        if self.debug_parse
            && let Ok(ast) = parser::parse(input)
        {
            println!("=== Parsed Tree ===");
            println!("{}", ast.print(ast.root()));
            println!();
        }

        let program = match exprel::compile(input, &self.options) {
            Ok(program) => program,
            Err(err) => {
                render_error(&err);
                return;
            }
        };

        if self.disassemble {
            println!("=== Bytecode ===");
            print!("{}", program.disassemble());
            println!();
        }

        match exprel::run_with(&program, self.env.as_ref(), &self.execution) {
            Ok(value) => println!("{}", value),
            Err(err) => render_error(&err),
        }
    }

    fn variable_names(&self) -> Vec<String> {
        self.env.names().map(|name| name.to_string()).collect()
    }
}

fn parse_expect(kind: &str) -> Result<Expect> {
    Ok(match kind.to_ascii_lowercase().as_str() {
        "int" => Expect::Int,
        "int64" => Expect::Int64,
        "float64" | "float" => Expect::Float64,
        "bool" => Expect::Bool,
        "string" => Expect::String,
        other => return Err(miette!("cannot expect {:?}", other)),
    })
}

/// Keeps reading lines while brackets are open.
struct BracketValidator;

impl Validator for BracketValidator {
    fn validate(&self, line: &str) -> ValidationResult {
        if lexer::is_incomplete(line) {
            ValidationResult::Incomplete
        } else {
            ValidationResult::Complete
        }
    }
}

fn add_menu_keybindings(keybindings: &mut Keybindings) {
    keybindings.add_binding(
        KeyModifiers::NONE,
        KeyCode::Tab,
        ReedlineEvent::UntilFound(vec![
            ReedlineEvent::Menu("completion_menu".to_string()),
            ReedlineEvent::MenuNext,
        ]),
    );
    keybindings.add_binding(
        KeyModifiers::ALT,
        KeyCode::Enter,
        ReedlineEvent::Edit(vec![EditCommand::InsertNewline]),
    );
}

fn setup_reedline(session: &Session) -> Result<(Reedline, DefaultPrompt)> {
    let variables = session.variable_names();
    let mut words: Vec<String> = builtins::BUILTINS
        .iter()
        .map(|builtin| builtin.name.to_string())
        .collect();
    words.extend(variables.iter().cloned());

    let completer = Box::new({
        let mut completions = DefaultCompleter::with_inclusions(&['_']);
        completions.insert(words);
        completions
    });

    let ide_menu = IdeMenu::default()
        .with_name("completion_menu")
        .with_min_completion_width(0)
        .with_max_completion_width(50)
        .with_max_completion_height(u16::MAX)
        .with_padding(0)
        .with_cursor_offset(0)
        .with_description_mode(DescriptionMode::PreferRight)
        .with_min_description_width(0)
        .with_max_description_width(50)
        .with_description_offset(1)
        .with_correct_cursor_pos(false);

    let mut keybindings = default_emacs_keybindings();
    add_menu_keybindings(&mut keybindings);

    let mut line_editor = Reedline::create()
        .with_highlighter(Box::new(Highlighter::new(variables)))
        .with_validator(Box::new(BracketValidator))
        .with_completer(completer)
        .with_menu(ReedlineMenu::EngineCompleter(Box::new(ide_menu)))
        .with_edit_mode(Box::new(Emacs::new(keybindings)));

    if let Some(dir) = dirs::data_dir().map(|dir| dir.join("exprel")) {
        std::fs::create_dir_all(&dir).into_diagnostic()?;
        let history = FileBackedHistory::with_file(1000, dir.join("history.txt"))
            .map_err(|err| miette!("cannot open history: {}", err))?;
        line_editor = line_editor.with_history(Box::new(history));
    }

    let prompt = DefaultPrompt::new(DefaultPromptSegment::Empty, DefaultPromptSegment::Empty);

    Ok((line_editor, prompt))
}

fn main() -> Result<()> {
    let args = Args::parse();

    use tracing_subscriber::{EnvFilter, fmt};

    // RUST_LOG controls the level; WARN when unset.
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("warn"))
        .into_diagnostic()?;

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let session = Session::from_args(&args)?;

    if let Some(expr) = &args.expression {
        session.interpret(expr);
        return Ok(());
    }

    if atty::is(atty::Stream::Stdin) {
        let (mut line_editor, prompt) = setup_reedline(&session)?;

        println!("exprel REPL - Type expressions to evaluate (Ctrl+D or Ctrl+C to exit)");

        loop {
            let sig = match line_editor.read_line(&prompt) {
                Ok(sig) => sig,
                Err(e) => {
                    eprintln!("Reedline error: {e}");
                    return Ok(());
                }
            };

            match sig {
                Signal::Success(buffer) => session.interpret(&buffer),
                Signal::CtrlD | Signal::CtrlC => {
                    println!("\nGoodbye!");
                    return Ok(());
                }
            }
        }
    }

    // One expression per line.
    let reader = BufReader::new(std::io::stdin().lock());
    for line in reader.lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                eprintln!("Error reading line from stdin: {}", e);
                return Ok(());
            }
        };
        session.interpret(&line);
    }

    Ok(())
}
