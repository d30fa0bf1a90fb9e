use std::env;
use std::sync::{Arc, Mutex};

use actix_web::middleware::Logger;
use actix_web::{App, HttpResponse, HttpServer, Responder, get, put, web};
use log::{error, info};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Deserialize;
use wordchain_core::store::{FileStore, Store};
use wordchain_core::{Chain, ChainError, StoreError};

const DEFAULT_BIND: &str = "127.0.0.1:5000";
const DEFAULT_DATA: &str = "./data";
const DEFAULT_WORDS: usize = 100;

/// Query parameters for the `/v1/generate` endpoint
#[derive(Deserialize)]
struct GenerateParams {
	words: Option<usize>,
	seed: Option<u64>,
}

/// Query parameters for the `/v1/load` endpoint
#[derive(Deserialize)]
struct LoadQuery {
	name: Option<String>,
	prefix: Option<usize>,
}

struct SharedData {
	store: FileStore,
	chain: Option<Arc<Chain>>,
}

impl SharedData {
	/// Returns the loaded chain, if any.
	fn loaded(&self) -> Option<Arc<Chain>> {
		self.chain.clone()
	}
}

/// HTTP GET endpoint `/v1/generate`
///
/// Generates at most `words` words from the loaded collection.
/// `seed` makes the walk reproducible.
#[get("/v1/generate")]
async fn get_generated(data: web::Data<Mutex<SharedData>>, query: web::Query<GenerateParams>) -> impl Responder {
	let chain = match data.lock() {
		Ok(shared) => shared.loaded(),
		Err(_) => return HttpResponse::InternalServerError().body("Model lock failed"),
	};
	let Some(chain) = chain else {
		return HttpResponse::Conflict().body("No collection loaded");
	};

	let words = query.words.unwrap_or(DEFAULT_WORDS);
	let mut rng = match query.seed {
		Some(seed) => StdRng::seed_from_u64(seed),
		None => StdRng::from_os_rng(),
	};

	match chain.generate_text(words, &mut rng) {
		Ok(text) => HttpResponse::Ok().body(text.trim_end().to_owned()),
		Err(e @ ChainError::PrefixTooShort { .. }) => HttpResponse::BadRequest().body(e.to_string()),
		Err(e) => HttpResponse::InternalServerError().body(e.to_string()),
	}
}

#[get("/v1/collections")]
async fn get_collections(data: web::Data<Mutex<SharedData>>) -> impl Responder {
	let shared = match data.lock() {
		Ok(m) => m,
		Err(_) => return HttpResponse::InternalServerError().body("Model lock failed"),
	};
	match shared.store.list_collections() {
		Ok(names) => HttpResponse::Ok().body(names.join("\n")),
		Err(e) => {
			error!("Failed to list collections: {e}");
			HttpResponse::InternalServerError().body("Failed to list collections")
		}
	}
}

#[get("/v1/loaded")]
async fn get_loaded(data: web::Data<Mutex<SharedData>>) -> impl Responder {
	let shared = match data.lock() {
		Ok(m) => m,
		Err(_) => return HttpResponse::InternalServerError().body("Model lock failed"),
	};
	match shared.loaded() {
		Some(chain) => HttpResponse::Ok().body(chain.collection()),
		None => HttpResponse::Ok().body(""),
	}
}

/// HTTP GET endpoint `/v1/prefixes`
///
/// Dumps the loaded chain, one `[key]: choices` line per prefix.
#[get("/v1/prefixes")]
async fn get_prefixes(data: web::Data<Mutex<SharedData>>) -> impl Responder {
	let chain = match data.lock() {
		Ok(shared) => shared.loaded(),
		Err(_) => return HttpResponse::InternalServerError().body("Model lock failed"),
	};
	match chain {
		Some(chain) => HttpResponse::Ok().body(chain.to_string()),
		None => HttpResponse::Conflict().body("No collection loaded"),
	}
}

/// HTTP PUT endpoint `/v1/load`
///
/// Replaces the loaded chain with the collection `name`.
///
/// The prefix length is read from the collection. When `prefix` is given
/// it must match, or the request is rejected.
#[put("/v1/load")]
async fn put_load(data: web::Data<Mutex<SharedData>>, query: web::Query<LoadQuery>) -> impl Responder {
	let mut shared = match data.lock() {
		Ok(m) => m,
		Err(_) => return HttpResponse::InternalServerError().body("Model lock failed"),
	};

	let name = match &query.name {
		Some(s) if !s.trim().is_empty() => s.trim(),
		_ => return HttpResponse::BadRequest().body("Missing or empty collection name"),
	};
	let collection = match shared.store.connect_existing(name) {
		Ok(c) => c,
		Err(e @ StoreError::NotFound(_)) => return HttpResponse::NotFound().body(e.to_string()),
		Err(e @ StoreError::InvalidName(_)) => return HttpResponse::BadRequest().body(e.to_string()),
		Err(e) => return HttpResponse::InternalServerError().body(format!("Failed to open collection: {e}")),
	};
	let loaded = match query.prefix {
		Some(prefix) => {
			let chain = Chain::new(prefix, false, Some(collection.name()));
			chain.restore(collection.as_ref()).map(|_| chain)
		}
		None => Chain::open(collection.as_ref(), false),
	};
	let chain = match loaded {
		Ok(chain) => chain,
		Err(e @ ChainError::PrefixMismatch { .. }) => return HttpResponse::BadRequest().body(e.to_string()),
		Err(e) => return HttpResponse::InternalServerError().body(format!("Failed to load collection: {e}")),
	};

	info!("Loaded [{name}] with {} prefixes", chain.len());
	shared.chain = Some(Arc::new(chain));
	HttpResponse::Ok().body("Collection loaded successfully")
}

/// Main entry point for the server.
///
/// Opens the collection store, wraps the shared state in a `Mutex`
/// and starts an Actix-web HTTP server.
///
/// # Notes
/// - Binds to `WORDCHAIN_BIND` (default 127.0.0.1:5000).
/// - Collections are read from `WORDCHAIN_DATA` (default ./data).
#[actix_web::main]
async fn main() -> std::io::Result<()> {
	env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

	let bind = env::var("WORDCHAIN_BIND").unwrap_or_else(|_| DEFAULT_BIND.to_owned());
	let dir = env::var("WORDCHAIN_DATA").unwrap_or_else(|_| DEFAULT_DATA.to_owned());
	let store = FileStore::open(&dir).map_err(std::io::Error::other)?;
	info!("Serving collections from {dir} on {bind}");

	let shared_data = SharedData { store, chain: None };
	let shared_model = web::Data::new(Mutex::new(shared_data));

	HttpServer::new(move || {
		App::new()
			.wrap(Logger::default())
			.app_data(shared_model.clone())
			.service(get_generated)
			.service(get_collections)
			.service(get_loaded)
			.service(get_prefixes)
			.service(put_load)
	})
		.bind(bind)?
		.run()
		.await
}
