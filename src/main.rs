use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tokio::sync::mpsc;

use quire::app::{App, AppEvent};
use quire::config::Config;
use quire::context::AppContext;
use quire::feed::{format_date, Facet, FeedEntry, FeedLoader};
use quire::store::{Post, PostDraft, TagRef, MAX_CONTENT_BYTES};
use quire::ui;
use quire::util::html_to_text;

/// Get the config directory path (~/.config/quire/)
fn get_config_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    Ok(PathBuf::from(home).join(".config").join("quire"))
}

/// Create the config directory with user-only permissions.
fn ensure_config_dir(config_dir: &Path) -> Result<()> {
    if !config_dir.exists() {
        std::fs::create_dir_all(config_dir).context("Failed to create config directory")?;
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        match std::fs::metadata(config_dir) {
            Ok(metadata) => {
                let mut perms = metadata.permissions();
                perms.set_mode(0o700);
                if let Err(e) = std::fs::set_permissions(config_dir, perms) {
                    tracing::warn!(
                        path = %config_dir.display(),
                        error = %e,
                        "Failed to set config directory permissions to 0700"
                    );
                }
            }
            Err(e) => {
                tracing::warn!(
                    path = %config_dir.display(),
                    error = %e,
                    "Failed to read config directory metadata"
                );
            }
        }
    }
    Ok(())
}

#[derive(Parser, Debug)]
#[command(name = "quire", about = "Terminal reader for a single-author blog")]
struct Args {
    /// Config file (default: ~/.config/quire/config.toml)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Database file (default: ~/.config/quire/quire.db)
    #[arg(long, value_name = "FILE")]
    db: Option<PathBuf>,

    /// Browse as this user id (overrides config and environment)
    #[arg(long = "as", value_name = "UID")]
    viewer: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print pages of a feed facet
    Feed {
        /// Latest, Top, Others or a tag label such as "Sapiens (Book)"
        #[arg(long, default_value = "Latest")]
        facet: String,

        /// Number of pages to load
        #[arg(long, default_value_t = 1)]
        pages: usize,
    },
    /// List the tag facets shown as tabs
    Facets,
    /// Manage posts (owner only)
    #[command(subcommand)]
    Post(PostCommand),
    /// Manage tag categories (owner only for writes)
    #[command(subcommand)]
    Category(CategoryCommand),
    /// Manage tags (owner only for writes)
    #[command(subcommand)]
    Tag(TagCommand),
}

#[derive(Subcommand, Debug)]
enum PostCommand {
    /// Create a post
    Add {
        #[arg(long)]
        title: String,
        #[arg(long)]
        subtitle: Option<String>,
        /// HTML body
        #[arg(long, conflicts_with = "file")]
        content: Option<String>,
        /// Read the HTML body from a file
        #[arg(long, value_name = "FILE")]
        file: Option<PathBuf>,
        #[arg(long)]
        image: Option<String>,
        /// Tag as Category:Name; repeatable
        #[arg(long = "tag", value_name = "CATEGORY:NAME")]
        tags: Vec<String>,
        /// Save as a draft instead of publishing
        #[arg(long)]
        draft: bool,
    },
    /// Publish a draft
    Publish { id: String },
    /// Move a post back to draft
    Unpublish { id: String },
    /// Delete a post
    Delete { id: String },
    /// Print a post
    Show { id: String },
}

#[derive(Subcommand, Debug)]
enum CategoryCommand {
    Add { name: String },
    List,
}

#[derive(Subcommand, Debug)]
enum TagCommand {
    Add {
        name: String,
        /// Category id or name
        #[arg(long)]
        category: String,
    },
    List,
}

/// Initialise tracing. The TUI owns the terminal, so it logs to a file.
fn init_tracing(log_file: Option<&Path>) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::from_default_env();
    match log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_dir = get_config_dir()?;
    ensure_config_dir(&config_dir)?;

    let log_file = config_dir.join("quire.log");
    init_tracing(args.command.is_none().then_some(log_file.as_path()))?;

    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| config_dir.join("config.toml"));
    let mut config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;
    config.apply_env();
    if let Some(viewer) = args.viewer.clone() {
        config.viewer_uid = Some(viewer);
    }

    let db_path = args.db.clone().unwrap_or_else(|| config_dir.join("quire.db"));
    let db_path_str = db_path
        .to_str()
        .ok_or_else(|| anyhow::anyhow!("Invalid UTF-8 in database path"))?;
    let ctx = AppContext::open(config, db_path_str).await?;

    match args.command {
        None => run_tui(&ctx).await,
        Some(Command::Feed { facet, pages }) => print_feed(&ctx, Facet::parse(&facet), pages).await,
        Some(Command::Facets) => print_facets(&ctx).await,
        Some(Command::Post(cmd)) => run_post_command(&ctx, cmd).await,
        Some(Command::Category(cmd)) => run_category_command(&ctx, cmd).await,
        Some(Command::Tag(cmd)) => run_tag_command(&ctx, cmd).await,
    }
}

async fn run_tui(ctx: &AppContext) -> Result<()> {
    let mut app = App::new(ctx);
    let (event_tx, event_rx) = mpsc::channel::<AppEvent>(32);
    ui::run(&mut app, event_tx, event_rx).await
}

// ============================================================================
// Reader Commands
// ============================================================================

async fn start_loader(ctx: &AppContext) -> Result<FeedLoader> {
    let mut loader = FeedLoader::new(
        ctx.documents(),
        ctx.posts_path().clone(),
        ctx.new_composer(),
    );
    loader.start().await.context("Failed to subscribe to posts")?;
    Ok(loader)
}

async fn print_feed(ctx: &AppContext, facet: Facet, pages: usize) -> Result<()> {
    let mut loader = start_loader(ctx).await?;
    if facet != Facet::Latest {
        loader.select_facet(facet).await;
    }
    for _ in 1..pages {
        if !loader.composer().has_more() {
            break;
        }
        loader.load_more().await;
    }

    let composer = loader.composer();
    if let Some(err) = composer.error() {
        bail!("{}", err);
    }

    println!("{} ({} posts)", composer.active_facet(), composer.visible_posts().len());
    for entry in composer.entries() {
        print_entry(&entry, composer.viewer_is_admin());
    }
    if composer.has_more() {
        println!("... more available (--pages {})", pages + 1);
    }
    Ok(())
}

fn print_entry(entry: &FeedEntry, show_draft: bool) {
    let badge = if show_draft && entry.post.is_draft {
        "[draft] "
    } else {
        ""
    };
    println!("{:>6}  {}{}  ({})", entry.date, badge, entry.post.title, entry.post.id);
    if !entry.excerpt.is_empty() {
        println!("        {}", entry.excerpt);
    }
}

async fn print_facets(ctx: &AppContext) -> Result<()> {
    let loader = start_loader(ctx).await?;
    let facets = loader.composer().top_facets();
    if facets.is_empty() {
        println!("No tags in use");
    }
    for facet in facets {
        println!("{:>4}  {}", facet.count, facet.display_name);
    }
    Ok(())
}

// ============================================================================
// Admin Commands
// ============================================================================

fn require_admin(ctx: &AppContext) -> Result<()> {
    if !ctx.session.is_admin() {
        bail!(
            "Only the blog owner can do this. Run with --as {} or set viewer_uid.",
            ctx.session.identity.owner_uid
        );
    }
    Ok(())
}

async fn run_post_command(ctx: &AppContext, cmd: PostCommand) -> Result<()> {
    let store = &ctx.store;
    let path = ctx.posts_path();

    match cmd {
        PostCommand::Show { id } => {
            let post = store
                .get_post(path, &id)
                .await?
                .filter(|p| ctx.session.is_admin() || !p.is_draft)
                .ok_or_else(|| anyhow::anyhow!("No post with id {}", id))?;
            print_post(&post);
        }
        PostCommand::Add {
            title,
            subtitle,
            content,
            file,
            image,
            tags,
            draft,
        } => {
            require_admin(ctx)?;
            let content = match (content, file) {
                (Some(c), _) => c,
                (None, Some(file)) => {
                    let meta = std::fs::metadata(&file)
                        .with_context(|| format!("Failed to read {}", file.display()))?;
                    if meta.len() > MAX_CONTENT_BYTES as u64 {
                        bail!("{} is larger than {} bytes", file.display(), MAX_CONTENT_BYTES);
                    }
                    std::fs::read_to_string(&file)
                        .with_context(|| format!("Failed to read {}", file.display()))?
                }
                (None, None) => bail!("Provide the body with --content or --file"),
            };

            let mut tag_refs: Vec<TagRef> = Vec::with_capacity(tags.len());
            for label in &tags {
                let tag = store
                    .resolve_tag_label(path, label)
                    .await
                    .with_context(|| format!("Failed to resolve tag {}", label))?;
                tag_refs.push(tag.to_ref());
            }

            let post_draft = PostDraft {
                title,
                subtitle,
                content,
                image_url: image,
                is_draft: draft,
                author_name: ctx.config.author_name.clone(),
                author_avatar: None,
                tags: tag_refs,
            };
            let post = store
                .save_post(path, &post_draft, None)
                .await
                .context("Failed to save post")?;
            println!("Created {} ({})", post.id, if post.is_draft { "draft" } else { "published" });
        }
        PostCommand::Publish { id } => {
            require_admin(ctx)?;
            store.set_draft(path, &id, false).await?;
            println!("Published {}", id);
        }
        PostCommand::Unpublish { id } => {
            require_admin(ctx)?;
            store.set_draft(path, &id, true).await?;
            println!("Moved {} to drafts", id);
        }
        PostCommand::Delete { id } => {
            require_admin(ctx)?;
            store.delete_post(path, &id).await?;
            println!("Deleted {}", id);
        }
    }
    Ok(())
}

fn print_post(post: &Post) {
    println!("{}", post.title);
    if let Some(subtitle) = &post.subtitle {
        println!("{}", subtitle);
    }
    let mut meta = format!("{} • {} views", format_date(post.created_at), post.views);
    if post.is_draft {
        meta.push_str(" • draft");
    }
    if !post.tags.is_empty() {
        let tags: Vec<String> = post
            .tags
            .iter()
            .map(|t| format!("{} ({})", t.name, t.category_name))
            .collect();
        meta.push_str(&format!(" • {}", tags.join(", ")));
    }
    println!("{}", meta);
    println!();
    println!("{}", html_to_text(&post.content));
}

async fn run_category_command(ctx: &AppContext, cmd: CategoryCommand) -> Result<()> {
    let path = ctx.posts_path();
    match cmd {
        CategoryCommand::Add { name } => {
            require_admin(ctx)?;
            let category = ctx.store.create_category(path, &name).await?;
            println!("Created category {} ({})", category.name, category.id);
        }
        CategoryCommand::List => {
            for category in ctx.store.list_categories(path).await? {
                println!("{}  {}", category.id, category.name);
            }
        }
    }
    Ok(())
}

async fn run_tag_command(ctx: &AppContext, cmd: TagCommand) -> Result<()> {
    let path = ctx.posts_path();
    match cmd {
        TagCommand::Add { name, category } => {
            require_admin(ctx)?;
            let categories = ctx.store.list_categories(path).await?;
            let category_id = categories
                .iter()
                .find(|c| c.id == category || c.name == category)
                .map(|c| c.id.clone())
                .ok_or_else(|| anyhow::anyhow!("No category named {}", category))?;
            let tag = ctx.store.create_tag(path, &name, &category_id).await?;
            println!("Created tag {} ({})", tag.name, tag.id);
        }
        TagCommand::List => {
            for tag in ctx.store.list_tags(path).await? {
                println!("{}  {} ({})", tag.id, tag.name, tag.category_name);
            }
        }
    }
    Ok(())
}
