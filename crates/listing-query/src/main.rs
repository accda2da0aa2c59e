//! Listing query command-line front end.
//!
//! Reads filter, sort and pagination criteria from flags or JSON and prints
//! the translated artefact: request parameters, predicate, sort key,
//! insight pipeline or SQL. `run` executes against a JSON file of documents
//! with the in-memory executor.
//!
//! Usage:
//!   listing-query params --filters '{"search":"engineer","salaryRange":"100000+"}' --sort-by salary
//!   listing-query --kind program pipeline skills --percentage per_group --native
//!   listing-query run listings.json --insight company

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use listing_query::config::Config;
use listing_query::listing::{
    FilterSpec, InsightKind, ListingKind, ListingSqlBuilder, PaginationSpec, PercentagePolicy,
    PipelineBuilder, QueryOptions, SortDirection, SortSpec, build_filter_predicate,
    build_query_params, build_sort_spec, document, memory, parse_query_string_with_limits,
    resolve_sort,
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Listing kind (job or program). Defaults to LISTING_KIND.
    #[arg(long, global = true)]
    kind: Option<ListingKind>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print remote API request parameters.
    Params {
        #[command(flatten)]
        criteria: CriteriaArgs,

        /// Print a percent-encoded query string instead of pairs.
        #[arg(long)]
        query_string: bool,

        /// Parse this query string back into criteria instead.
        #[arg(long, conflicts_with = "query_string")]
        parse: Option<String>,
    },

    /// Print the filter predicate.
    Predicate {
        #[command(flatten)]
        criteria: CriteriaArgs,

        /// Drop the active/public default scope.
        #[arg(long)]
        unrestricted: bool,

        /// Restrict to one organization.
        #[arg(long)]
        organization: Option<String>,

        /// Render as a document-store find query.
        #[arg(long)]
        native: bool,
    },

    /// Resolve a logical sort key.
    Sort {
        sort_by: String,

        #[arg(long, default_value = "desc")]
        order: SortDirection,
    },

    /// Print an insight pipeline.
    Pipeline {
        /// statistics, company, location or skills.
        insight: InsightKind,

        #[command(flatten)]
        criteria: CriteriaArgs,

        #[arg(long)]
        organization: Option<String>,

        /// Skill percentage denominator. Defaults to LISTING_PERCENTAGE_POLICY.
        #[arg(long)]
        percentage: Option<PercentagePolicy>,

        /// Render as document-store stages.
        #[arg(long)]
        native: bool,
    },

    /// Print PostgreSQL SELECT and COUNT statements.
    Sql {
        #[command(flatten)]
        criteria: CriteriaArgs,

        #[arg(long, default_value = "listing")]
        table: String,
    },

    /// Execute against a JSON array of documents.
    Run {
        documents: PathBuf,

        #[command(flatten)]
        criteria: CriteriaArgs,

        /// Run an insight pipeline instead of a paged listing.
        #[arg(long)]
        insight: Option<InsightKind>,

        #[arg(long)]
        organization: Option<String>,
    },
}

/// Filter, sort and pagination flags shared by subcommands.
#[derive(Args, Debug, Default)]
struct CriteriaArgs {
    /// Filters as JSON.
    #[arg(long, conflicts_with = "filters_file")]
    filters: Option<String>,

    /// Path to a JSON file of filters.
    #[arg(long)]
    filters_file: Option<PathBuf>,

    /// Logical sort key.
    #[arg(long)]
    sort_by: Option<String>,

    #[arg(long, default_value = "desc")]
    sort_order: SortDirection,

    #[arg(long, default_value = "1")]
    page: u32,

    /// Page size. Defaults to LISTING_DEFAULT_LIMIT.
    #[arg(long)]
    limit: Option<u32>,
}

impl CriteriaArgs {
    fn filters(&self) -> Result<Option<FilterSpec>> {
        let raw = match (&self.filters, &self.filters_file) {
            (Some(json), _) => json.clone(),
            (None, Some(path)) => fs::read_to_string(path)
                .with_context(|| format!("failed to read filters from {}", path.display()))?,
            (None, None) => return Ok(None),
        };
        let spec = serde_json::from_str(&raw).context("filters must be a JSON object")?;
        Ok(Some(spec))
    }

    fn sort(&self) -> Option<SortSpec> {
        self.sort_by
            .as_ref()
            .map(|by| SortSpec::new(by.clone(), self.sort_order))
    }

    fn pagination(&self, config: &Config) -> Result<PaginationSpec> {
        let limit = self.limit.unwrap_or(config.default_limit);
        PaginationSpec::with_max_limit(self.page, limit, config.max_limit)
            .context("invalid pagination")
    }
}

fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    init_tracing();

    let cli = Cli::parse();
    let config = Config::from_env().context("failed to load configuration")?;
    let kind = cli.kind.unwrap_or(config.kind);

    info!(%kind, "translating listing query");

    match cli.command {
        Command::Params {
            criteria,
            query_string,
            parse,
        } => {
            if let Some(query) = parse {
                let parsed = parse_query_string_with_limits(kind, &query, config.page_limits())?;
                return print_json(&serde_json::json!({
                    "pagination": parsed.pagination,
                    "filters": parsed.filters,
                    "sort": parsed.sort,
                }));
            }
            let params = build_query_params(
                kind,
                &criteria.pagination(&config)?,
                criteria.filters()?.as_ref(),
                criteria.sort().as_ref(),
            )?;
            if query_string {
                println!("{}", params.to_query_string());
                Ok(())
            } else {
                print_json(&params)
            }
        }
        Command::Predicate {
            criteria,
            unrestricted,
            organization,
            native,
        } => {
            let options = query_options(unrestricted, organization);
            let predicate = build_filter_predicate(kind, criteria.filters()?.as_ref(), &options)?;
            if native {
                let sort = build_sort_spec(kind, criteria.sort().as_ref());
                print_json(&document::find_document(
                    &predicate,
                    &sort,
                    &criteria.pagination(&config)?,
                ))
            } else {
                print_json(&predicate)
            }
        }
        Command::Sort { sort_by, order } => {
            let resolution = resolve_sort(kind, &sort_by, order);
            print_json(&serde_json::json!({
                "key": resolution.key(),
                "fallback": resolution.is_fallback(),
                "native": document::sort_document(resolution.key()),
            }))
        }
        Command::Pipeline {
            insight,
            criteria,
            organization,
            percentage,
            native,
        } => {
            let pipeline = pipeline_builder(kind, &config, organization, percentage)
                .build(insight, criteria.filters()?.as_ref())?;
            if native {
                print_json(&document::pipeline_documents(&pipeline))
            } else {
                print_json(&pipeline)
            }
        }
        Command::Sql { criteria, table } => {
            let predicate = build_filter_predicate(
                kind,
                criteria.filters()?.as_ref(),
                &QueryOptions::default(),
            )?;
            let sort = build_sort_spec(kind, criteria.sort().as_ref());
            let builder = ListingSqlBuilder::for_kind(kind).with_table(table);
            println!(
                "{};",
                builder.build(&predicate, &sort, &criteria.pagination(&config)?)
            );
            println!("{};", builder.build_count(&predicate));
            Ok(())
        }
        Command::Run {
            documents,
            criteria,
            insight,
            organization,
        } => {
            let docs = read_documents(&documents)?;
            let filters = criteria.filters()?;
            match insight {
                Some(insight) => {
                    let pipeline = pipeline_builder(kind, &config, organization, None)
                        .build(insight, filters.as_ref())?;
                    print_json(&memory::execute(&pipeline, &docs))
                }
                None => {
                    let options = query_options(false, organization);
                    let predicate = build_filter_predicate(kind, filters.as_ref(), &options)?;
                    let sort = build_sort_spec(kind, criteria.sort().as_ref());
                    let page =
                        memory::select(&docs, &predicate, &sort, &criteria.pagination(&config)?);
                    print_json(&page)
                }
            }
        }
    }
}

fn query_options(unrestricted: bool, organization: Option<String>) -> QueryOptions {
    let mut options = if unrestricted {
        QueryOptions::unrestricted()
    } else {
        QueryOptions::default()
    };
    options.organization_id = organization;
    options
}

fn pipeline_builder(
    kind: ListingKind,
    config: &Config,
    organization: Option<String>,
    percentage: Option<PercentagePolicy>,
) -> PipelineBuilder {
    let builder = PipelineBuilder::new(kind)
        .with_percentage_policy(percentage.unwrap_or(config.percentage_policy));
    match organization {
        Some(org) => builder.for_organization(org),
        None => builder,
    }
}

fn read_documents(path: &Path) -> Result<Vec<serde_json::Value>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read documents from {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("{} must contain a JSON array of documents", path.display()))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
