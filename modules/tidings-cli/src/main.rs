use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{Duration, NaiveDate};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

use tidings_common::{
    engagement, Config, DigestKind, Discussion, EngagementMetrics, TidingsError,
};
use tidings_pipeline::research::SonarSearcher;
use tidings_pipeline::{
    DigestService, DiscussionSelector, InMemoryDigestStore, ModelRouter, Orchestrator,
};

#[derive(Parser)]
#[command(name = "tidings", about = "Community digest generator")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate a digest from a file of discussion records.
    Generate {
        #[arg(long, value_enum, default_value_t = KindArg::Weekly)]
        kind: KindArg,

        /// Regenerate even if a digest already exists for this date.
        #[arg(long)]
        force: bool,

        /// Target date (YYYY-MM-DD); defaults to today.
        #[arg(long)]
        date: Option<NaiveDate>,

        /// JSON file with an array of discussion records.
        #[arg(long)]
        input: PathBuf,

        /// Directory to write the rendered formats into.
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum KindArg {
    Daily,
    Weekly,
    Monthly,
}

impl From<KindArg> for DigestKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Daily => DigestKind::Daily,
            KindArg::Weekly => DigestKind::Weekly,
            KindArg::Monthly => DigestKind::Monthly,
        }
    }
}

/// Selector backed by a JSON export of discussion records. Scores each
/// record at selection time so ranking reflects the file as given.
struct FileSelector {
    discussions: Vec<Discussion>,
}

impl FileSelector {
    fn load(path: &PathBuf) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let discussions: Vec<Discussion> =
            serde_json::from_str(&raw).context("parsing discussion records")?;
        Ok(Self { discussions })
    }
}

#[async_trait::async_trait]
impl DiscussionSelector for FileSelector {
    async fn select(
        &self,
        kind: DigestKind,
        target_date: NaiveDate,
        min_score: f64,
        limit: usize,
    ) -> Result<Vec<(Discussion, EngagementMetrics)>, TidingsError> {
        let window_start = target_date - Duration::days(kind.window_days());
        let now = target_date
            .and_hms_opt(23, 59, 59)
            .unwrap_or_default()
            .and_utc();

        let mut rows: Vec<(Discussion, EngagementMetrics)> = self
            .discussions
            .iter()
            .filter(|d| {
                let date = d.created_at.date_naive();
                date > window_start && date <= target_date
            })
            .map(|d| (d.clone(), engagement::compute_metrics(d, now)))
            .filter(|(_, m)| m.engagement_score >= min_score)
            .collect();

        rows.sort_by(|a, b| b.1.engagement_score.total_cmp(&a.1.engagement_score));
        rows.truncate(limit);
        Ok(rows)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("tidings=info".parse()?))
        .init();

    let cli = Cli::parse();
    let config = Config::from_env();
    config.log_redacted();

    match cli.command {
        Command::Generate {
            kind,
            force,
            date,
            input,
            out,
        } => {
            let selector = Arc::new(FileSelector::load(&input)?);
            let store = Arc::new(InMemoryDigestStore::new());

            let router = ModelRouter::from_config(&config);
            let research = if config.research_api_key.is_empty() {
                None
            } else {
                Some(Arc::new(SonarSearcher::new(
                    config.research_api_key.clone(),
                    reqwest::Client::new(),
                )) as Arc<dyn tidings_pipeline::research::ResearchSource>)
            };
            let orchestrator = Orchestrator::new(config.clone(), router, research);
            let service = DigestService::new(config, selector, store, orchestrator);

            let record = service
                .generate(kind.into(), force, date)
                .await
                .map_err(|e| anyhow::anyhow!("{e}"))?;

            info!(
                digest_id = %record.id,
                status = ?record.status,
                quality = record.quality_score,
                "Digest generated"
            );

            println!("\n=== {} ===", record.title);
            println!(
                "Status: {:?}  |  Quality: {:.2}  |  Warnings: {}",
                record.status,
                record.quality_score,
                record.warnings.len()
            );
            if let Some(draft) = &record.draft {
                println!(
                    "Sections: {}  |  {} words  |  ~{} min read",
                    draft.sections.len(),
                    draft.total_word_count,
                    draft.estimated_read_time_min
                );
            }

            if let (Some(dir), Some(formats)) = (out, &record.formats) {
                std::fs::create_dir_all(&dir)
                    .with_context(|| format!("creating {}", dir.display()))?;
                let stem = format!("{}_{}", record.kind, record.target_date);
                std::fs::write(dir.join(format!("{stem}.html")), &formats.html)?;
                std::fs::write(dir.join(format!("{stem}.md")), &formats.markdown)?;
                std::fs::write(dir.join(format!("{stem}.txt")), &formats.text)?;
                println!("Rendered formats written to {}", dir.display());
            }
        }
    }

    Ok(())
}
