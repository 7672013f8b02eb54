use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use log::{info, warn};
use tokio_util::sync::CancellationToken;

use mangascrape::config::Config;
use mangascrape::outcome::Fetched;
use mangascrape::repository::Repository;
use mangascrape::{sources, NetworkClient, Series};

/// Browse and download manga through the site adapters
#[derive(Parser)]
#[command(name = "mangascrape")]
#[command(about = "List series, chapters and pages from supported manga sites", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the registered site adapters
    Repos,
    /// List the series a site offers
    Series {
        /// Site name as shown by `repos`
        repo: String,
    },
    /// List a series' chapters, oldest first
    Chapters {
        repo: String,
        /// Series title (substring match) or zero-based index
        series: String,
    },
    /// Download every page image of one chapter
    Download {
        repo: String,
        series: String,
        /// Chapter title (substring match) or zero-based index
        chapter: String,
        /// Output root; defaults to the configured download directory
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
}

fn find_repo(
    repos: &[Arc<dyn Repository>],
    name: &str,
) -> Result<Arc<dyn Repository>, Box<dyn Error>> {
    repos
        .iter()
        .find(|r| r.info().name.eq_ignore_ascii_case(name))
        .cloned()
        .ok_or_else(|| format!("no adapter named {:?}; try `repos`", name).into())
}

/// Select by zero-based index or case-insensitive title substring.
fn pick_index(titles: &[&str], key: &str) -> Option<usize> {
    if let Ok(index) = key.parse::<usize>() {
        return (index < titles.len()).then_some(index);
    }
    let needle = key.to_lowercase();
    titles
        .iter()
        .position(|title| title.to_lowercase().contains(&needle))
}

async fn fetch_series(
    repo: &Arc<dyn Repository>,
    token: &CancellationToken,
) -> Result<Vec<Series>, Box<dyn Error>> {
    if repo.info().requires_special_handling {
        return Err(format!(
            "{} needs special handling and is not usable from this generic client",
            repo.info().name
        )
        .into());
    }
    match repo.series(token).await {
        Fetched::Found(series) => Ok(series),
        Fetched::Missing => Err(format!("could not fetch series from {}", repo.info().name).into()),
        Fetched::Cancelled => Err("cancelled".into()),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let cli = Cli::parse();
    let config = Config::load();

    let client: Arc<dyn NetworkClient> = Arc::new(config.network.create_http_client()?);
    let repos = sources::all(client);

    let token = CancellationToken::new();
    let ctrlc = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, cancelling in-flight work");
            ctrlc.cancel();
        }
    });

    match cli.command {
        Commands::Repos => {
            for repo in &repos {
                let info = repo.info();
                let note = if info.requires_special_handling {
                    "  (special handling)"
                } else {
                    ""
                };
                println!("{}  {}{}", info.name, info.root, note);
            }
        }
        Commands::Series { repo } => {
            let repo = find_repo(&repos, &repo)?;
            for (index, series) in fetch_series(&repo, &token).await?.iter().enumerate() {
                println!("{:3}  {}  [{}]", index, series.title, series.updated);
            }
        }
        Commands::Chapters {
            repo,
            series: series_key,
        } => {
            let repo = find_repo(&repos, &repo)?;
            let series_list = fetch_series(&repo, &token).await?;
            let titles: Vec<&str> = series_list.iter().map(|s| s.title.as_str()).collect();
            let Some(index) = pick_index(&titles, &series_key) else {
                return Err(format!("no series matching {:?}", series_key).into());
            };
            let series = &series_list[index];
            match series.chapters(&token).await {
                Fetched::Found(chapters) => {
                    for (i, chapter) in chapters.iter().enumerate() {
                        println!("{:3}  {}  [{}]", i, chapter.title, chapter.updated);
                    }
                }
                Fetched::Missing => {
                    return Err(format!("could not fetch chapters of {}", series.title).into())
                }
                Fetched::Cancelled => return Err("cancelled".into()),
            }
        }
        Commands::Download {
            repo,
            series: series_key,
            chapter: chapter_key,
            out,
        } => {
            let repo = find_repo(&repos, &repo)?;
            let series_list = fetch_series(&repo, &token).await?;
            let titles: Vec<&str> = series_list.iter().map(|s| s.title.as_str()).collect();
            let Some(index) = pick_index(&titles, &series_key) else {
                return Err(format!("no series matching {:?}", series_key).into());
            };
            let series = &series_list[index];

            let chapters = match series.chapters(&token).await {
                Fetched::Found(chapters) => chapters,
                Fetched::Missing => {
                    return Err(format!("could not fetch chapters of {}", series.title).into())
                }
                Fetched::Cancelled => return Err("cancelled".into()),
            };
            let titles: Vec<&str> = chapters.iter().map(|c| c.title.as_str()).collect();
            let Some(index) = pick_index(&titles, &chapter_key) else {
                return Err(format!("no chapter matching {:?}", chapter_key).into());
            };
            let chapter = &chapters[index];

            let mut pages = match chapter.pages(&token).await {
                Fetched::Found(pages) => pages,
                Fetched::Missing => {
                    return Err(format!("could not fetch pages of {}", chapter.title).into())
                }
                Fetched::Cancelled => return Err("cancelled".into()),
            };

            let root = out.unwrap_or_else(|| PathBuf::from(&config.download_dir));
            let target = chapter.suggest_path(&root);
            std::fs::create_dir_all(&target)?;
            info!("saving {} pages to {}", pages.len(), target.display());

            for page in pages.iter_mut() {
                match page.image(&token).await {
                    Fetched::Found(bytes) => {
                        let ext = page
                            .image_uri
                            .as_ref()
                            .and_then(|uri| uri.path().rsplit('.').next().map(str::to_string))
                            .filter(|e| e.len() <= 4)
                            .unwrap_or_else(|| "jpg".to_string());
                        let file = target.join(format!("{:03}.{}", page.number, ext));
                        std::fs::write(&file, &bytes)?;
                        println!("{}", file.display());
                    }
                    Fetched::Missing => warn!("page {} has no extractable image", page.number),
                    Fetched::Cancelled => return Err("cancelled".into()),
                }
                tokio::time::sleep(Duration::from_millis(config.network.rate_limit_delay_ms))
                    .await;
            }
        }
    }

    Ok(())
}
