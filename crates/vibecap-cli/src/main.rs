//! Vibecap CLI - AI-captioned image posts

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, anyhow};
use async_trait::async_trait;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::warn;
use uuid::Uuid;
use vibecap_core::ai::{CaptionGenerator, CaptionOptions, GeminiClient};
use vibecap_core::caption::{Vibe, normalize};
use vibecap_core::config::{AI_API_KEY_VAR, Config, IMAGE_STORE_KEY_VAR};
use vibecap_core::domain::post::{
    BulkUpdate, Category, NewPost, Post, PostQuery, PostRepository, PostService, PostUpdate,
    SortField, SortOrder, parse_tags,
};
use vibecap_core::domain::user::{PreferencesUpdate, ProfileUpdate, Theme, User, UserRepository, UserService};
use vibecap_core::media::{ImageKitClient, ImageStore, ImageUpload, StoredImage};
use vibecap_core::session::{
    FileSettingsStore, LogoutReason, SessionObserver, SessionTimer, SettingsUpdate,
    TokenExpiryWatcher, TokenObserver,
};
use vibecap_core::share;
use vibecap_core::storage::Database;

#[cfg(test)]
mod main_tests;

const DEFAULT_SHARE_BASE_URL: &str = "https://vibecap.app";

#[derive(Parser)]
#[command(name = "vibecap")]
#[command(author, version, about = "AI-captioned image posts", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text")]
    format: OutputFormat,

    /// Quiet mode (minimal output)
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Caption utilities
    Caption {
        #[command(subcommand)]
        action: CaptionAction,
    },

    /// Manage posts
    Post {
        #[command(subcommand)]
        action: PostAction,
    },

    /// Manage users
    User {
        #[command(subcommand)]
        action: UserAction,
    },

    /// Session timeout settings and timers
    Session {
        #[command(subcommand)]
        action: SessionAction,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum CaptionAction {
    /// Clean up a raw caption the way generated captions are
    Normalize {
        text: String,
        /// Fun, Professional, Dramatic, Minimal, Adventurous or Wholesome
        #[arg(short, long, default_value = "Fun")]
        vibe: String,
    },
}

#[derive(Subcommand)]
enum PostAction {
    /// Caption and upload an image as a new post
    Create {
        image: PathBuf,
        #[arg(short, long)]
        user: String,
        #[arg(short, long)]
        vibe: Option<String>,
        /// Language code (en, es, fr, ...)
        #[arg(short, long)]
        language: Option<String>,
        /// Extra context for the caption
        #[arg(short, long)]
        prompt: Option<String>,
        #[arg(short, long)]
        category: Option<String>,
        /// Comma-separated tags
        #[arg(short, long)]
        tags: Option<String>,
        #[arg(long)]
        public: bool,
    },
    /// List posts
    List {
        #[arg(short, long)]
        user: String,
        #[arg(short, long)]
        search: Option<String>,
        /// Category or "all"
        #[arg(short, long)]
        category: Option<String>,
        /// Comma-separated tags; matches any
        #[arg(short, long)]
        tags: Option<String>,
        #[arg(long, default_value = "createdAt")]
        sort: String,
        #[arg(long, default_value = "desc")]
        order: String,
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = vibecap_core::domain::post::DEFAULT_PAGE_SIZE)]
        limit: u32,
    },
    /// Edit a post
    Update {
        id: Uuid,
        #[arg(short, long)]
        user: String,
        #[arg(long)]
        caption: Option<String>,
        #[arg(short, long)]
        category: Option<String>,
        #[arg(short, long)]
        tags: Option<String>,
        #[arg(long)]
        public: Option<bool>,
    },
    /// Apply one edit to several posts
    BulkUpdate {
        #[arg(required = true)]
        ids: Vec<Uuid>,
        #[arg(short, long)]
        user: String,
        #[arg(short, long)]
        category: Option<String>,
        #[arg(short, long)]
        tags: Option<String>,
        #[arg(long)]
        public: Option<bool>,
    },
    /// Delete a post and its image
    Delete {
        id: Uuid,
        #[arg(short, long)]
        user: String,
    },
    /// Delete every post of a user
    DeleteAll {
        #[arg(short, long)]
        user: String,
        #[arg(long)]
        force: bool,
    },
    /// Post statistics for a user
    Stats {
        #[arg(short, long)]
        user: String,
    },
    /// Share links for a public post
    Share {
        id: Uuid,
        #[arg(long, default_value = DEFAULT_SHARE_BASE_URL)]
        base_url: String,
    },
}

#[derive(Subcommand)]
enum UserAction {
    /// Create a user
    Create { username: String },
    /// Show a user
    Show { username: String },
    /// Rename a user
    Update {
        username: String,
        #[arg(long)]
        new_username: String,
    },
    /// Change preferences
    Preferences {
        username: String,
        /// light, dark or system
        #[arg(long)]
        theme: Option<String>,
        /// Comma-separated vibes
        #[arg(long)]
        styles: Option<String>,
        #[arg(long)]
        default_category: Option<String>,
    },
    /// Upload a profile picture
    AvatarSet { username: String, image: PathBuf },
    /// Remove the profile picture
    AvatarDelete { username: String },
}

#[derive(Subcommand)]
enum SessionAction {
    /// Show current session settings
    Show,
    /// Dump settings diagnostics
    Settings,
    /// Change session settings
    Set {
        /// Inactivity timeout in minutes
        #[arg(long)]
        timeout: Option<i64>,
        #[arg(long)]
        warnings: Option<bool>,
        #[arg(long)]
        auto_logout: Option<bool>,
        #[arg(long)]
        pause_when_hidden: Option<bool>,
    },
    /// Wait for the stored login token to expire
    Watch,
    /// Run the inactivity timer; Enter extends, `q` logs out
    Start,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Get a configuration value
    Get { key: String },
    /// Set a configuration value
    Set { key: String, value: String },
    /// List all configuration values
    List,
    /// Reset configuration to defaults
    Reset,
    /// Show config file path
    Path,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("vibecap=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let out = Output {
        format: cli.format,
        quiet: cli.quiet,
    };

    match cli.command {
        Commands::Caption { action } => cmd_caption(action, out),
        Commands::Post { action } => cmd_post(action, out).await,
        Commands::User { action } => cmd_user(action, out).await,
        Commands::Session { action } => cmd_session(action, out).await,
        Commands::Config { action } => cmd_config(action, out.quiet),
    }
}

// ============================================================================
// Wiring
// ============================================================================

#[derive(Clone, Copy)]
struct Output {
    format: OutputFormat,
    quiet: bool,
}

impl Output {
    fn json(&self) -> bool {
        self.format == OutputFormat::Json
    }

    fn emit_json<T: Serialize>(&self, value: &T) -> anyhow::Result<()> {
        println!("{}", serde_json::to_string_pretty(value)?);
        Ok(())
    }
}

/// Stand-in collaborator for a service whose key is not configured
struct Unconfigured(&'static str);

#[async_trait]
impl CaptionGenerator for Unconfigured {
    async fn generate_caption(
        &self,
        _image: &ImageUpload,
        _opts: &CaptionOptions,
    ) -> vibecap_core::Result<String> {
        Err(vibecap_core::Error::ApiKeyMissing(self.0))
    }
}

#[async_trait]
impl ImageStore for Unconfigured {
    async fn upload(&self, _bytes: &[u8], _file_name: &str) -> vibecap_core::Result<StoredImage> {
        Err(vibecap_core::Error::ApiKeyMissing(self.0))
    }

    async fn delete(&self, _file_id: &str) -> vibecap_core::Result<()> {
        Err(vibecap_core::Error::ApiKeyMissing(self.0))
    }
}

/// Which remote services a command cannot run without
#[derive(Clone, Copy, Default)]
struct Needs {
    captions: bool,
    images: bool,
}

struct App {
    posts: PostService,
    users: UserService,
}

impl App {
    async fn open(config: &Config, needs: Needs) -> anyhow::Result<Self> {
        let captions: Arc<dyn CaptionGenerator> = match GeminiClient::from_config(&config.ai) {
            Ok(client) => Arc::new(client),
            Err(e) if needs.captions => return Err(e.into()),
            Err(_) => Arc::new(Unconfigured(AI_API_KEY_VAR)),
        };
        let images: Arc<dyn ImageStore> = match ImageKitClient::from_config(&config.images) {
            Ok(client) => Arc::new(client),
            Err(e) if needs.images => return Err(e.into()),
            Err(_) => Arc::new(Unconfigured(IMAGE_STORE_KEY_VAR)),
        };

        let db = Database::open(config.database_path()?).await?;
        let pool = db.pool().clone();

        Ok(Self {
            posts: PostService::new(
                PostRepository::new(pool.clone()),
                UserRepository::new(pool.clone()),
                captions,
                images.clone(),
            ),
            users: UserService::new(UserRepository::new(pool), images),
        })
    }

    async fn user(&self, username: &str) -> anyhow::Result<User> {
        Ok(self.users.get_by_username(username).await?)
    }
}

fn session_store(config: &Config) -> anyhow::Result<Arc<FileSettingsStore>> {
    Ok(Arc::new(FileSettingsStore::new(config.settings_dir()?)))
}

fn session_timer(config: &Config) -> anyhow::Result<SessionTimer> {
    Ok(SessionTimer::builder()
        .store(session_store(config)?)
        .warning_window(Duration::from_secs(config.session.warning_window_secs))
        .build())
}

fn parse_vibe(s: &str) -> anyhow::Result<Vibe> {
    Vibe::parse(s).ok_or_else(|| {
        let names: Vec<&str> = Vibe::ALL.iter().map(|v| v.as_str()).collect();
        anyhow!("Unknown vibe '{}'. Choose one of: {}", s, names.join(", "))
    })
}

fn parse_category(s: &str) -> anyhow::Result<Category> {
    Category::parse(s).ok_or_else(|| {
        let names: Vec<&str> = Category::ALL.iter().map(|c| c.as_str()).collect();
        anyhow!("Unknown category '{}'. Choose one of: {}", s, names.join(", "))
    })
}

fn parse_optional_category(s: Option<&str>) -> anyhow::Result<Option<Category>> {
    s.map(parse_category).transpose()
}

fn print_post(post: &Post) {
    let visibility = if post.is_public { "public" } else { "private" };
    println!("  {} [{}] ({})", post.id, post.category, visibility);
    println!("    {}", post.caption);
    if !post.tags.is_empty() {
        println!("    tags: {}", post.tags.join(", "));
    }
}

// ============================================================================
// Command Implementations
// ============================================================================

fn cmd_caption(action: CaptionAction, out: Output) -> anyhow::Result<()> {
    match action {
        CaptionAction::Normalize { text, vibe } => {
            let vibe = parse_vibe(&vibe)?;
            let caption = normalize(&text, vibe);
            if out.json() {
                out.emit_json(&serde_json::json!({ "caption": caption, "vibe": vibe }))?;
            } else {
                println!("{}", caption);
            }
        }
    }
    Ok(())
}

async fn cmd_post(action: PostAction, out: Output) -> anyhow::Result<()> {
    let config = Config::load()?;

    match action {
        PostAction::Create {
            image,
            user,
            vibe,
            language,
            prompt,
            category,
            tags,
            public,
        } => {
            let app = App::open(
                &config,
                Needs {
                    captions: true,
                    images: true,
                },
            )
            .await?;
            let user = app.user(&user).await?;
            let upload = ImageUpload::from_path(&image)
                .await
                .with_context(|| format!("Failed to read image {}", image.display()))?;

            if !out.quiet && !out.json() {
                println!("Generating caption...");
            }

            let post = app
                .posts
                .create_post(
                    user.id,
                    NewPost {
                        image: Some(upload),
                        vibe,
                        language,
                        extra_prompt: prompt,
                        category: parse_optional_category(category.as_deref())?
                            .unwrap_or(user.preferences.default_category),
                        tags: tags.as_deref().map(parse_tags).unwrap_or_default(),
                        is_public: public,
                    },
                )
                .await?;

            if out.json() {
                out.emit_json(&post)?;
            } else {
                if !out.quiet {
                    println!("Post created!");
                }
                print_post(&post);
                println!("    image: {}", post.image_url);
            }
        }

        PostAction::List {
            user,
            search,
            category,
            tags,
            sort,
            order,
            page,
            limit,
        } => {
            let app = App::open(&config, Needs::default()).await?;
            let user = app.user(&user).await?;
            let query = PostQuery {
                search,
                category: category.as_deref().and_then(PostQuery::parse_category),
                tags: tags.as_deref().map(parse_tags).unwrap_or_default(),
                sort_by: SortField::parse(&sort)
                    .ok_or_else(|| anyhow!("Unknown sort field '{}'", sort))?,
                order: SortOrder::parse(&order)
                    .ok_or_else(|| anyhow!("Unknown sort order '{}'", order))?,
                page,
                limit,
            };
            let page = app.posts.list_posts(user.id, query).await?;

            if out.json() {
                out.emit_json(&page)?;
            } else if page.posts.is_empty() {
                if !out.quiet {
                    println!("No posts found.");
                    println!("\nCreate one with: vibecap post create <image> --user {}", user.username);
                }
            } else {
                for post in &page.posts {
                    print_post(post);
                }
                if !out.quiet {
                    let p = page.pagination;
                    println!(
                        "\nPage {} of {} ({} posts)",
                        p.current_page, p.total_pages, p.total_posts
                    );
                }
            }
        }

        PostAction::Update {
            id,
            user,
            caption,
            category,
            tags,
            public,
        } => {
            let app = App::open(&config, Needs::default()).await?;
            let user = app.user(&user).await?;
            let update = PostUpdate {
                caption,
                category: parse_optional_category(category.as_deref())?,
                tags: tags.as_deref().map(parse_tags),
                is_public: public,
            };
            let post = app.posts.update_post(user.id, id, update).await?;

            if out.json() {
                out.emit_json(&post)?;
            } else {
                if !out.quiet {
                    println!("Post updated.");
                }
                print_post(&post);
            }
        }

        PostAction::BulkUpdate {
            ids,
            user,
            category,
            tags,
            public,
        } => {
            let app = App::open(&config, Needs::default()).await?;
            let user = app.user(&user).await?;
            let updates = BulkUpdate {
                category: parse_optional_category(category.as_deref())?,
                tags: tags.as_deref().map(parse_tags),
                is_public: public,
            };
            if updates.is_empty() {
                return Err(anyhow!(
                    "Nothing to update. Pass --category, --tags or --public."
                ));
            }
            let modified = app.posts.bulk_update(user.id, &ids, updates).await?;

            if out.json() {
                out.emit_json(&serde_json::json!({ "modifiedCount": modified }))?;
            } else if !out.quiet {
                println!("Updated {} post(s).", modified);
            }
        }

        PostAction::Delete { id, user } => {
            let app = App::open(
                &config,
                Needs {
                    images: true,
                    ..Default::default()
                },
            )
            .await?;
            let user = app.user(&user).await?;
            app.posts.delete_post(user.id, id).await?;
            if !out.quiet {
                println!("Post {} deleted.", id);
            }
        }

        PostAction::DeleteAll { user, force } => {
            if !force {
                return Err(anyhow!(
                    "This deletes every post of '{}'. Re-run with --force to confirm.",
                    user
                ));
            }
            let app = App::open(
                &config,
                Needs {
                    images: true,
                    ..Default::default()
                },
            )
            .await?;
            let user = app.user(&user).await?;
            let deleted = app.posts.delete_all_posts(user.id).await?;

            if out.json() {
                out.emit_json(&serde_json::json!({ "deletedCount": deleted }))?;
            } else if !out.quiet {
                println!("Deleted {} post(s).", deleted);
            }
        }

        PostAction::Stats { user } => {
            let app = App::open(&config, Needs::default()).await?;
            let user = app.user(&user).await?;
            let stats = app.posts.user_stats(user.id).await?;

            if out.json() {
                out.emit_json(&stats)?;
            } else {
                println!("Stats for {}", user.username);
                println!("  Posts: {}", stats.user_stats.total_posts);
                println!("  Likes: {}", stats.user_stats.total_likes);
                println!("  Avg posts/month: {}", stats.avg_posts_per_month);
                for (category, count) in &stats.category_breakdown {
                    println!("  {}: {}", category, count);
                }
                for (style, count) in &stats.style_breakdown {
                    println!("  {} vibe: {}", style, count);
                }
            }
        }

        PostAction::Share { id, base_url } => {
            let app = App::open(&config, Needs::default()).await?;
            let shared = app.posts.shared_post(id).await?;
            let page = share::share_url(&base_url, id)?;
            let links = share::social_links(&base_url, &shared.post)?;

            if out.json() {
                out.emit_json(&serde_json::json!({
                    "url": page.as_str(),
                    "author": shared.author,
                    "links": links,
                }))?;
            } else {
                println!("{}", page);
                for link in links {
                    println!("  {}: {}", link.platform, link.url);
                }
            }
        }
    }
    Ok(())
}

async fn cmd_user(action: UserAction, out: Output) -> anyhow::Result<()> {
    let config = Config::load()?;
    let needs = Needs {
        images: matches!(
            action,
            UserAction::AvatarSet { .. } | UserAction::AvatarDelete { .. }
        ),
        ..Default::default()
    };
    let app = App::open(&config, needs).await?;

    let (user, message) = match action {
        UserAction::Create { username } => (app.users.create(&username).await?, "User created."),
        UserAction::Show { username } => (app.user(&username).await?, ""),
        UserAction::Update {
            username,
            new_username,
        } => {
            let user = app.user(&username).await?;
            let update = ProfileUpdate {
                username: Some(new_username),
                ..Default::default()
            };
            (app.users.update_profile(user.id, update).await?, "User updated.")
        }
        UserAction::Preferences {
            username,
            theme,
            styles,
            default_category,
        } => {
            let user = app.user(&username).await?;
            let update = PreferencesUpdate {
                theme: theme
                    .as_deref()
                    .map(|t| Theme::parse(t).ok_or_else(|| anyhow!("Unknown theme '{}'", t)))
                    .transpose()?,
                favorite_styles: styles
                    .as_deref()
                    .map(|s| parse_tags(s).iter().map(|v| parse_vibe(v)).collect::<anyhow::Result<Vec<_>>>())
                    .transpose()?,
                default_category: parse_optional_category(default_category.as_deref())?,
            };
            if update.is_empty() {
                return Err(anyhow!(
                    "Nothing to update. Pass --theme, --styles or --default-category."
                ));
            }
            (app.users.update_preferences(user.id, update).await?, "Preferences updated.")
        }
        UserAction::AvatarSet { username, image } => {
            let user = app.user(&username).await?;
            let upload = ImageUpload::from_path(&image)
                .await
                .with_context(|| format!("Failed to read image {}", image.display()))?;
            (
                app.users.upload_profile_picture(user.id, upload).await?,
                "Profile picture updated.",
            )
        }
        UserAction::AvatarDelete { username } => {
            let user = app.user(&username).await?;
            (
                app.users.delete_profile_picture(user.id).await?,
                "Profile picture removed.",
            )
        }
    };

    if out.json() {
        return out.emit_json(&user);
    }
    if !out.quiet && !message.is_empty() {
        println!("{}", message);
    }
    println!("User: {}", user.username);
    println!("  ID: {}", user.id);
    println!("  Theme: {}", user.preferences.theme);
    println!("  Default category: {}", user.preferences.default_category);
    if !user.preferences.favorite_styles.is_empty() {
        let styles: Vec<&str> = user.preferences.favorite_styles.iter().map(|v| v.as_str()).collect();
        println!("  Favorite styles: {}", styles.join(", "));
    }
    if let Some(picture) = &user.profile_picture {
        println!("  Picture: {}", picture);
    }
    println!("  Posts: {}", user.stats.total_posts);
    println!("  Joined: {}", user.stats.joined_at.format("%Y-%m-%d %H:%M:%S"));
    Ok(())
}

/// Forwards timer callbacks to the CLI loop
struct ChannelObserver(mpsc::UnboundedSender<SessionEvent>);

enum SessionEvent {
    Warning(i64),
    Logout(LogoutReason),
    Resume,
    TokenExpired,
}

impl ChannelObserver {
    fn send(&self, event: SessionEvent) {
        if self.0.send(event).is_err() {
            warn!("Session event dropped, receiver closed");
        }
    }
}

impl SessionObserver for ChannelObserver {
    fn on_logout(&self, reason: LogoutReason) {
        self.send(SessionEvent::Logout(reason));
    }

    fn on_warning(&self, remaining_ms: i64) {
        self.send(SessionEvent::Warning(remaining_ms));
    }

    fn on_activity_resume(&self) {
        self.send(SessionEvent::Resume);
    }
}

impl TokenObserver for ChannelObserver {
    fn on_token_expired(&self) {
        self.send(SessionEvent::TokenExpired);
    }
}

async fn cmd_session(action: SessionAction, out: Output) -> anyhow::Result<()> {
    let config = Config::load()?;
    let timer = session_timer(&config)?;

    match action {
        SessionAction::Show => {
            timer.load_settings().await;
            let info = timer.session_info();
            if out.json() {
                out.emit_json(&info)?;
            } else {
                let s = info.settings;
                println!("Session settings:");
                println!("  Timeout: {} minutes", s.session_timeout);
                println!("  Warnings: {}", s.show_warnings);
                println!("  Auto logout on close: {}", s.auto_logout_on_close);
                println!("  Pause when hidden: {}", s.pause_when_hidden);
            }
        }

        SessionAction::Settings => {
            timer.load_settings().await;
            let debug = timer.debug_settings().await;
            if out.json() {
                out.emit_json(&debug)?;
            } else {
                println!("Settings: {:?}", debug.settings);
                println!("Timeout (ms): {}", debug.timeout_ms);
                println!("Warning window (ms): {}", debug.warning_window_ms);
                println!(
                    "Stored: {}",
                    debug.stored.as_deref().unwrap_or("(nothing stored)")
                );
                println!("Store: {}", config.settings_dir()?.display());
            }
        }

        SessionAction::Set {
            timeout,
            warnings,
            auto_logout,
            pause_when_hidden,
        } => {
            let update = SettingsUpdate {
                session_timeout: timeout,
                show_warnings: warnings,
                auto_logout_on_close: auto_logout,
                pause_when_hidden,
            };
            if update.is_empty() {
                return Err(anyhow!(
                    "Nothing to update. Pass --timeout, --warnings, --auto-logout or --pause-when-hidden."
                ));
            }
            timer.load_settings().await;
            let settings = timer.save_settings(update).await?;
            if out.json() {
                out.emit_json(&settings)?;
            } else if !out.quiet {
                println!("Session settings updated.");
                println!("  Timeout: {} minutes", settings.session_timeout);
            }
        }

        SessionAction::Watch => {
            let (tx, mut rx) = mpsc::unbounded_channel();
            let watcher = TokenExpiryWatcher::new(session_store(&config)?);
            let expiry = match watcher.expiry().await? {
                Some(expiry) => expiry,
                None => watcher.record_token_issued().await?,
            };
            if !out.quiet {
                println!("Token expires at {}", expiry.format("%Y-%m-%d %H:%M:%S"));
            }

            if watcher.check_expiry().await {
                println!("Token expired.");
                return Ok(());
            }
            watcher.start(Arc::new(ChannelObserver(tx)));
            while let Some(event) = rx.recv().await {
                if let SessionEvent::TokenExpired = event {
                    println!("Token expired.");
                    break;
                }
            }
            watcher.stop();
        }

        SessionAction::Start => {
            let (tx, mut rx) = mpsc::unbounded_channel();
            timer.init(Arc::new(ChannelObserver(tx))).await;
            timer.start_session();
            if !out.quiet {
                let info = timer.session_info();
                println!(
                    "Session started ({} minute timeout). Press Enter to stay signed in, q to log out.",
                    info.settings.session_timeout
                );
            }

            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            let mut stdin_open = true;
            loop {
                tokio::select! {
                    line = lines.next_line(), if stdin_open => match line? {
                        Some(l) if l.trim().eq_ignore_ascii_case("q") => timer.logout(),
                        Some(_) => {
                            timer.extend_session();
                            let remaining = timer.session_info().time_until_expiry / 1000;
                            println!("Session extended ({}s left).", remaining);
                        }
                        None => stdin_open = false,
                    },
                    event = rx.recv() => match event {
                        Some(SessionEvent::Warning(ms)) => {
                            println!("Your session expires in {} seconds. Press Enter to stay signed in.", ms / 1000);
                        }
                        Some(SessionEvent::Resume) => println!("Session resumed."),
                        Some(SessionEvent::Logout(reason)) => {
                            println!("Logged out ({}).", reason);
                            break;
                        }
                        Some(SessionEvent::TokenExpired) => {}
                        None => break,
                    },
                }
            }
            timer.destroy();
        }
    }
    Ok(())
}

fn cmd_config(action: ConfigAction, quiet: bool) -> anyhow::Result<()> {
    match action {
        ConfigAction::Get { key } => {
            let config = Config::load()?;
            let value = config.get(&key)?;
            println!("{}", value);
        }
        ConfigAction::Set { key, value } => {
            let mut config = Config::load()?;
            config.set(&key, &value)?;
            config.save()?;
            if !quiet {
                println!("Set {} = {}", key, value);
            }
        }
        ConfigAction::List => {
            let config = Config::load()?;
            let items = config.list()?;
            for (key, value) in items {
                println!("{} = {}", key, value);
            }
        }
        ConfigAction::Reset => {
            Config::reset()?;
            if !quiet {
                println!("Configuration reset to defaults.");
            }
        }
        ConfigAction::Path => {
            let path = Config::config_path()?;
            println!("{}", path.display());
        }
    }
    Ok(())
}
