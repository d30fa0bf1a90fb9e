//! Command-line host for the word chain generator.
//!
//! Trains a chain from a seed file or live console input, optionally on top
//! of a previously saved collection, saves it, then prints generated text.

use std::error::Error;
use std::io::{self, BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::{self, ExitCode};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;

use clap::Parser;
use log::{LevelFilter, error, info, warn};
use rand::SeedableRng;
use rand::rngs::StdRng;
use wordchain_core::Chain;
use wordchain_core::model::builder::LiveOutcome;
use wordchain_core::model::persist::DEFAULT_WORKERS;
use wordchain_core::store::{FileStore, Store};

#[derive(Parser, Debug)]
#[command(name = "wordchain", about = "Build a random text with Markov-ish rules")]
struct Args {
	/// Maximum number of words to print
	#[arg(long, default_value_t = 100)]
	words: usize,

	/// Prefix length in words
	#[arg(long, default_value_t = 2)]
	prefix: usize,

	/// Text file to use as seed (live console input when absent)
	#[arg(long)]
	file: Option<PathBuf>,

	/// Log every association, starter and generation step
	#[arg(long)]
	verbose: bool,

	/// Seed for the random generator (reproducible output)
	#[arg(long)]
	seed: Option<u64>,

	/// Directory holding saved collections
	#[arg(long, env = "WORDCHAIN_DATA", default_value = "./data")]
	data: PathBuf,

	/// Collection name for a new chain (prompted when absent)
	#[arg(long)]
	collection: Option<String>,

	/// Number of save workers
	#[arg(long, default_value_t = DEFAULT_WORKERS)]
	workers: usize,
}

/// What to do with an existing collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
	/// Generate from it as-is.
	Use,
	/// Train more text into it.
	Append,
	/// Ignore existing collections and start a new chain.
	New,
}

fn init_logging(verbose: bool) {
	let level = if verbose { LevelFilter::Debug } else { LevelFilter::Info };
	let mut builder = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
	builder.format_timestamp_millis();
	builder.filter_level(level);
	let _ = builder.try_init();
}

fn main() -> ExitCode {
	let args = Args::parse();
	init_logging(args.verbose);

	match run(&args) {
		Ok(()) => ExitCode::SUCCESS,
		Err(e) => {
			error!("{e}");
			ExitCode::FAILURE
		}
	}
}

fn run(args: &Args) -> Result<(), Box<dyn Error>> {
	let store = FileStore::open(&args.data)?;
	let collections = store.list_collections()?;

	let (chain, action) = if collections.is_empty() {
		warn!("There are no available collections. Start from scratch");
		(new_chain(args)?, Action::New)
	} else {
		print!("Want to [u]se, [a]ppend to an existing collection? [n]o(new) ");
		io::stdout().flush()?;
		match ask_for_action()? {
			None => {
				eprintln!("Bye\n");
				return Ok(());
			}
			Some(Action::New) => (new_chain(args)?, Action::New),
			Some(action) => {
				let name = &collections[choose_collection(&collections)?];
				(load(&store, args, name)?, action)
			}
		}
	};
	let chain = Arc::new(chain);

	if action != Action::Use {
		match &args.file {
			Some(file) => {
				chain.load(file)?;
			}
			None => {
				println!("-- wordchain live --\n\ntype your text (Enter x2 to stop)...\n");
				let outcome = chain.build_live(BufReader::new(io::stdin()), interrupt_channel());
				if outcome == LiveOutcome::Interrupted {
					info!("Live input interrupted");
				}
			}
		}

		if chain.is_empty() {
			return Err("Empty text map. Cannot generate text".into());
		}
		if args.verbose {
			print!("{}", chain.pretty());
		}
		let report = chain.save(&store, args.workers)?;
		if report.failed > 0 {
			warn!("{} of {} nodes were not saved", report.failed, report.failed + report.saved);
		}
	}

	let mut rng = match args.seed {
		Some(seed) => StdRng::seed_from_u64(seed),
		None => StdRng::from_os_rng(),
	};
	let mut out = Vec::new();
	chain.generate(&mut out, args.words, &mut rng)?;
	println!("{}", String::from_utf8_lossy(&out));
	Ok(())
}

/// Exit status of a process ended by Ctrl-C.
const INTERRUPTED_STATUS: i32 = 130;

/// Forwards Ctrl-C to the returned receiver while it is alive.
///
/// Once the receiver is dropped (the live build is over), the next Ctrl-C
/// ends the process as it would without a listener.
fn interrupt_channel() -> Receiver<()> {
	let (tx, rx) = mpsc::channel();
	thread::spawn(move || {
		let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
			Ok(runtime) => runtime,
			Err(e) => {
				warn!("Cannot listen for interrupts: {e}");
				return;
			}
		};
		while runtime.block_on(tokio::signal::ctrl_c()).is_ok() {
			if !forward_interrupt(&tx) {
				eprintln!("Interrupted");
				process::exit(INTERRUPTED_STATUS);
			}
		}
	});
	rx
}

/// Returns `false` once nobody listens for interrupts anymore.
fn forward_interrupt(tx: &Sender<()>) -> bool {
	tx.send(()).is_ok()
}

fn new_chain(args: &Args) -> io::Result<Chain> {
	let name = match &args.collection {
		Some(name) => name.clone(),
		None => {
			print!("Collection name: ");
			io::stdout().flush()?;
			read_answer()?
		}
	};
	Ok(Chain::new(args.prefix, args.verbose, Some(&name)))
}

/// Opens `name` and rehydrates a chain from it.
///
/// The prefix length is the one the collection was trained with.
fn load(store: &dyn Store, args: &Args, name: &str) -> Result<Chain, Box<dyn Error>> {
	let collection = store.connect_existing(name)?;
	println!("Using {name} with {} prefixes", collection.count()?);

	let chain = Chain::open(collection.as_ref(), args.verbose)?;
	if chain.prefix_len() != args.prefix {
		warn!("[{name}] uses prefixes of {} words, ignoring --prefix {}", chain.prefix_len(), args.prefix);
	}
	Ok(chain)
}

fn read_answer() -> io::Result<String> {
	read_answer_from(io::stdin().lock())
}

/// Reads one trimmed line. A closed input is an error, not an empty answer.
fn read_answer_from<R: BufRead>(mut reader: R) -> io::Result<String> {
	let mut line = String::new();
	if reader.read_line(&mut line)? == 0 {
		return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "input closed while waiting for an answer"));
	}
	Ok(line.trim().to_owned())
}

/// Asks until a recognised answer is given. `None` means quit.
///
/// An empty answer defaults to a new chain.
fn ask_for_action() -> io::Result<Option<Action>> {
	loop {
		let answer = read_answer()?;
		match answer.to_lowercase().as_str() {
			"u" | "use" => return Ok(Some(Action::Use)),
			"a" | "app" | "append" => return Ok(Some(Action::Append)),
			"" | "n" | "no" | "new" => return Ok(Some(Action::New)),
			"q" | "quit" | "exit" => return Ok(None),
			_ => {
				eprint!("Please type use|append|new and then press enter: ");
				io::stderr().flush()?;
			}
		}
	}
}

/// Lists collections and asks for an index until a valid one is given.
fn choose_collection(collections: &[String]) -> io::Result<usize> {
	for (i, name) in collections.iter().enumerate() {
		println!("[{i}] {name}");
	}
	println!("----");

	let mut msg = "";
	loop {
		print!("[0-{:02}]: {msg} ", collections.len() - 1);
		io::stdout().flush()?;
		match read_answer()?.parse::<usize>() {
			Ok(i) if i < collections.len() => return Ok(i),
			_ => msg = "(nope)",
		}
	}
}
