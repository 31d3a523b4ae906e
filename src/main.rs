use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use explorer::api::client::extract_episode_ids;
use explorer::api::{ApiClient, ApiError, Character};
use explorer::config::Config;
use explorer::state::favorites::FavoritesStore;
use explorer::state::load::{
    DetailLoader, ListLoader, LoadState, RetryPolicy, ViewError, summary_line, visible_characters,
};
use explorer::state::notes::{NotesStore, ValidationError};
use explorer::state::optimistic::{OptimisticFavorite, ToggleOutcome};
use explorer::state::pagination::{PageSlot, PaginationInfo};
use explorer::state::search::SearchDebouncer;
use explorer::state::theme::{Theme, ThemeStore};
use explorer::state::url::{GenderFilter, SortKey, SortOrder, StatusFilter, UrlPatch, UrlRouter};
use explorer::storage::{FileStorage, KvStore, StorageError};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("{0}")]
    View(&'static str),
    #[error("note {0} not found")]
    NoteNotFound(String),
    #[error("invalid theme: {0}")]
    InvalidTheme(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

impl From<ViewError> for CliError {
    fn from(err: ViewError) -> Self {
        Self::View(err.message())
    }
}

#[derive(Parser, Debug)]
#[command(name = "explorer", about = "Browse characters, favorites, and notes from the terminal")]
struct Cli {
    /// Overrides EXPLORER_API_BASE_URL.
    #[arg(long)]
    api_base_url: Option<String>,

    /// Overrides EXPLORER_DATA_DIR.
    #[arg(long)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch one page of characters for a URL query.
    List {
        /// Current query string, e.g. `status=alive&page=2`.
        #[arg(long, default_value = "")]
        query: String,
        /// Drop every filter before applying the patch.
        #[arg(long)]
        reset: bool,
        #[command(flatten)]
        patch: PatchArgs,
    },
    /// Show one character.
    Show { id: String },
    /// List the episodes a character appears in.
    Episodes { id: String },
    Fav(FavCommand),
    Notes(NotesCommand),
    Theme(ThemeCommand),
    /// Apply a patch to a query and print the resulting URL.
    Url {
        query: String,
        #[arg(long)]
        reset: bool,
        #[command(flatten)]
        patch: PatchArgs,
    },
    /// Read search text from stdin, one line per edit, and print the URL
    /// each time the input settles.
    Search {
        #[arg(long, default_value = "")]
        query: String,
    },
}

#[derive(Args, Debug)]
struct PatchArgs {
    #[arg(long)]
    page: Option<u32>,
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    status: Option<StatusFilter>,
    #[arg(long)]
    species: Option<String>,
    #[arg(long)]
    gender: Option<GenderFilter>,
    #[arg(long)]
    sort: Option<SortKey>,
    #[arg(long)]
    order: Option<SortOrder>,
    #[arg(long)]
    favorites: Option<bool>,
}

impl PatchArgs {
    fn into_patch(self) -> UrlPatch {
        UrlPatch {
            page: self.page,
            name: self.name,
            status: self.status,
            species: self.species,
            gender: self.gender,
            sort: self.sort,
            order: self.order,
            favorites: self.favorites,
        }
    }
}

#[derive(Args, Debug)]
struct FavCommand {
    #[command(subcommand)]
    command: FavSubcommand,
}

#[derive(Subcommand, Debug)]
enum FavSubcommand {
    Toggle { id: u32 },
    List,
    Clear,
    /// Flip the favorites-only filter on a query.
    Filter {
        #[arg(long, default_value = "")]
        query: String,
    },
}

#[derive(Args, Debug)]
struct NotesCommand {
    id: u32,
    #[command(subcommand)]
    command: NotesSubcommand,
}

#[derive(Subcommand, Debug)]
enum NotesSubcommand {
    List,
    Add { text: String },
    Edit { note_id: String, text: String },
    Delete { note_id: String },
}

#[derive(Args, Debug)]
struct ThemeCommand {
    #[command(subcommand)]
    command: ThemeSubcommand,
}

#[derive(Subcommand, Debug)]
enum ThemeSubcommand {
    Get,
    Set { theme: String },
    Toggle,
}

struct CliContext {
    config: Config,
    kv: KvStore,
    favorites: FavoritesStore,
}

impl CliContext {
    fn client(&self) -> Result<ApiClient, CliError> {
        Ok(ApiClient::from_config(&self.config)?)
    }
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("explorer=info")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = Config::from_env();
    if let Some(url) = cli.api_base_url {
        config.api_base_url = url;
    }
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }

    let storage = FileStorage::open(&config.data_dir)?;
    let kv = KvStore::new(Arc::new(storage));
    let favorites = FavoritesStore::load(kv.clone());
    let ctx = CliContext { config, kv, favorites };

    match cli.command {
        Command::List { query, reset, patch } => run_list(&ctx, &query, reset, patch).await,
        Command::Show { id } => run_show(&ctx, &id).await,
        Command::Episodes { id } => run_episodes(&ctx, &id).await,
        Command::Fav(fav) => run_fav(&ctx, fav),
        Command::Notes(notes) => run_notes(&ctx, notes),
        Command::Theme(theme) => run_theme(&ctx, theme),
        Command::Url { query, reset, patch } => {
            let router = route(&query, reset, patch);
            println!("{}", router.url());
            Ok(())
        }
        Command::Search { query } => run_search(&ctx, &query).await,
    }
}

fn route(query: &str, reset: bool, patch: PatchArgs) -> UrlRouter {
    let mut router = UrlRouter::from_url(query);
    if reset {
        router.reset();
    }
    let patch = patch.into_patch();
    if !patch.is_empty() {
        router.update(&patch);
    }
    router
}

/// Non-numeric or non-positive ids become 0, which the detail view rejects.
fn parse_id(raw: &str) -> u32 {
    raw.trim().parse().unwrap_or(0)
}

// =============================================================================
// LIST / DETAIL
// =============================================================================

async fn run_list(ctx: &CliContext, query: &str, reset: bool, patch: PatchArgs) -> Result<(), CliError> {
    let router = route(query, reset, patch);
    let state = router.state();
    eprintln!("{}", router.url());

    let policy = RetryPolicy::new(ctx.config.list_retries, ctx.config.retry_base());
    let list = ListLoader::new(Arc::new(ctx.client()?), policy);
    list.load((&state).into()).await;

    let page = match list.state() {
        LoadState::Ready(page) => page,
        LoadState::Failed(err) => return Err(err.into()),
        LoadState::Idle | LoadState::Loading => return Ok(()),
    };

    let shown = visible_characters(&page, state.favorites, &ctx.favorites);
    println!("{}", summary_line(&page, shown.len(), state.page, state.favorites));
    for character in &shown {
        print_row(ctx, character);
    }

    let pagination = PaginationInfo::new(state.page, &page);
    if pagination.is_visible() {
        let bar: Vec<String> = pagination
            .visible_pages()
            .into_iter()
            .map(|slot| match slot {
                PageSlot::Page(n) if n == pagination.current_page => format!("[{n}]"),
                PageSlot::Page(n) => n.to_string(),
                PageSlot::Gap => "…".to_owned(),
            })
            .collect();
        println!("{}", bar.join(" "));
    }
    Ok(())
}

fn print_row(ctx: &CliContext, character: &Character) {
    let star = if ctx.favorites.is_favorite(character.id) { "★" } else { " " };
    println!(
        "{star} {:>4}  {}  ({} · {} · {})",
        character.id, character.name, character.status, character.species, character.gender
    );
}

async fn fetch_detail(ctx: &CliContext, raw_id: &str) -> Result<(ApiClient, Character), CliError> {
    let client = ctx.client()?;
    let policy = RetryPolicy::new(ctx.config.detail_retries, ctx.config.retry_base());
    let detail = DetailLoader::new(Arc::new(client.clone()), policy);
    detail.load(parse_id(raw_id)).await;
    match detail.state() {
        LoadState::Ready(character) => Ok((client, character)),
        LoadState::Failed(err) => Err(err.into()),
        LoadState::Idle | LoadState::Loading => Err(ApiError::Cancelled.into()),
    }
}

async fn run_show(ctx: &CliContext, raw_id: &str) -> Result<(), CliError> {
    let (_, character) = fetch_detail(ctx, raw_id).await?;
    print_row(ctx, &character);
    if !character.kind.is_empty() {
        println!("  type:     {}", character.kind);
    }
    println!("  origin:   {}", character.origin.name);
    println!("  location: {}", character.location.name);
    println!("  episodes: {}", character.episode.len());

    let mut notes = NotesStore::open(ctx.kv.clone(), character.id);
    println!("  notes:    {}", notes.notes().len());
    Ok(())
}

async fn run_episodes(ctx: &CliContext, raw_id: &str) -> Result<(), CliError> {
    let (client, character) = fetch_detail(ctx, raw_id).await?;
    let ids = extract_episode_ids(&character.episode);
    let episodes = client.episodes_by_ids(&ids, &CancellationToken::new()).await?;
    for episode in episodes {
        println!("{}  {}  ({})", episode.episode, episode.name, episode.air_date);
    }
    Ok(())
}

// =============================================================================
// LOCAL STORES
// =============================================================================

fn run_fav(ctx: &CliContext, fav: FavCommand) -> Result<(), CliError> {
    match fav.command {
        FavSubcommand::Toggle { id } => {
            let mut button = OptimisticFavorite::new(id);
            match button.toggle(&ctx.favorites) {
                ToggleOutcome::Committed { favorite } => {
                    println!("{id}: {}", if favorite { "favorite" } else { "not favorite" });
                    Ok(())
                }
                ToggleOutcome::RolledBack { error, .. } => Err(error.into()),
            }
        }
        FavSubcommand::List => {
            for id in ctx.favorites.favorite_ids() {
                println!("{id}");
            }
            eprintln!("{} favorites", ctx.favorites.favorite_count());
            Ok(())
        }
        FavSubcommand::Clear => Ok(ctx.favorites.clear_favorites()?),
        FavSubcommand::Filter { query } => {
            if ctx.favorites.favorite_count() == 0 {
                eprintln!("no favorites yet");
                return Ok(());
            }
            let mut router = UrlRouter::from_url(&query);
            let patch = UrlPatch::toggle_favorites(&router.state());
            println!("{}", router.update(&patch).url);
            Ok(())
        }
    }
}

fn run_notes(ctx: &CliContext, cmd: NotesCommand) -> Result<(), CliError> {
    let mut store = NotesStore::open(ctx.kv.clone(), cmd.id);
    match cmd.command {
        NotesSubcommand::List => {
            for note in store.notes() {
                println!("{}  {}  {}", note.id, note.updated_at, note.text);
            }
        }
        NotesSubcommand::Add { text } => {
            let note = store.add_note(&text)?;
            println!("{}", note.id);
        }
        NotesSubcommand::Edit { note_id, text } => {
            if store.edit_note(&note_id, &text)?.is_none() {
                return Err(CliError::NoteNotFound(note_id));
            }
        }
        NotesSubcommand::Delete { note_id } => {
            if !store.delete_note(&note_id) {
                return Err(CliError::NoteNotFound(note_id));
            }
        }
    }
    Ok(())
}

fn run_theme(ctx: &CliContext, cmd: ThemeCommand) -> Result<(), CliError> {
    let store = ThemeStore::new(ctx.kv.clone());
    let theme = match cmd.command {
        ThemeSubcommand::Get => store.resolve(ctx.config.prefers_dark),
        ThemeSubcommand::Set { theme } => {
            let theme: Theme = theme.parse().map_err(CliError::InvalidTheme)?;
            store.set(theme);
            theme
        }
        ThemeSubcommand::Toggle => store.toggle(store.resolve(ctx.config.prefers_dark)),
    };
    println!("{theme}");
    Ok(())
}

// =============================================================================
// SEARCH
// =============================================================================

async fn run_search(ctx: &CliContext, query: &str) -> Result<(), CliError> {
    let quiet = ctx.config.search_debounce();
    let mut router = UrlRouter::from_url(query);
    let mut debouncer = SearchDebouncer::spawn(&router.state().name, quiet);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => match line? {
                Some(text) => debouncer.input(&text),
                None => break,
            },
            Some(patch) = debouncer.next_patch() => {
                println!("{}", router.update(&patch).url);
            }
        }
    }

    // Input closed; let a pending edit settle.
    if let Ok(Some(patch)) = tokio::time::timeout(quiet * 2, debouncer.next_patch()).await {
        println!("{}", router.update(&patch).url);
    }
    Ok(())
}
