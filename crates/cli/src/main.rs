use anyhow::{anyhow, ensure, Context, Result};
use catalog::validation::{self, MovieFields, SearchQuery};
use catalog::{Movie, MovieId, Rating, RatingAggregate};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use store::{MovieRepository, RatingAggregator, StoreConfig};
use tokio::sync::Semaphore;
use tracing::{debug, info};

/// Reel Catalog - movie catalog and rating tool
#[derive(Parser)]
#[command(name = "reel-catalog")]
#[command(about = "Browse, edit and rate the movie catalog", long_about = None)]
struct Cli {
    /// Path to the catalog database
    #[arg(short, long, env = "CATALOG_DB_PATH", default_value = "catalog.db")]
    db_path: PathBuf,

    /// Maximum number of concurrent store connections
    #[arg(long, env = "CATALOG_DB_POOL_SIZE", default_value = "10")]
    pool_size: usize,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List every movie in the catalog
    List,

    /// Show a single movie
    Show {
        /// Movie ID to display
        #[arg(long)]
        id: MovieId,
    },

    /// Search by title, director, genre (case-insensitive substring) or year
    Search {
        #[arg(long)]
        title: Option<String>,

        #[arg(long)]
        director: Option<String>,

        #[arg(long)]
        genre: Option<String>,

        #[arg(long)]
        year: Option<String>,
    },

    /// Add a movie to the catalog
    Add {
        #[arg(long)]
        title: String,

        #[arg(long)]
        director: String,

        #[arg(long)]
        year: Option<i64>,

        #[arg(long)]
        genre: Option<String>,

        #[arg(long)]
        description: Option<String>,

        #[arg(long)]
        poster_url: Option<String>,
    },

    /// Submit a rating (1-5) for a movie
    Rate {
        #[arg(long)]
        id: MovieId,

        #[arg(long)]
        rating: i64,
    },

    /// Hammer the rating aggregator and check that no update is lost
    Benchmark {
        /// Number of ratings to submit
        #[arg(long, default_value = "100")]
        requests: usize,

        /// Number of concurrent submissions
        #[arg(long, default_value = "10")]
        concurrent: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    let config = StoreConfig::new(&cli.db_path).with_pool_size(cli.pool_size);
    let pool = store::open(config, 1, Duration::ZERO)
        .await
        .with_context(|| format!("Failed to open catalog at {}", cli.db_path.display()))?;
    let movies = MovieRepository::new(pool.clone());
    let ratings = RatingAggregator::new(pool);

    // Dispatch to appropriate command handler
    match cli.command {
        Commands::List => handle_list(&movies).await?,
        Commands::Show { id } => handle_show(&movies, id).await?,
        Commands::Search {
            title,
            director,
            genre,
            year,
        } => {
            let query = SearchQuery {
                title,
                director,
                genre,
                year,
            };
            handle_search(&movies, query).await?
        }
        Commands::Add {
            title,
            director,
            year,
            genre,
            description,
            poster_url,
        } => {
            let fields = MovieFields {
                title: Some(title),
                director: Some(director),
                year,
                genre,
                description,
                poster_url,
            };
            handle_add(&movies, fields).await?
        }
        Commands::Rate { id, rating } => handle_rate(&ratings, id, rating).await?,
        Commands::Benchmark {
            requests,
            concurrent,
        } => handle_benchmark(&movies, &ratings, requests, concurrent).await?,
    }

    Ok(())
}

/// Handle the 'list' command
async fn handle_list(movies: &MovieRepository) -> Result<()> {
    let all = movies.list().await?;
    println!("{}", format!("Catalog ({} movies):", all.len()).bold().blue());
    print_movies(&all);
    Ok(())
}

/// Handle the 'show' command
async fn handle_show(movies: &MovieRepository, id: MovieId) -> Result<()> {
    let movie = movies.get(id).await?;

    println!("{}", format!("Movie {}", movie.id).bold().blue());
    println!("{}Title: {}", "• ".green(), movie.title);
    println!("{}Director: {}", "• ".green(), movie.director);
    if let Some(year) = movie.year {
        println!("{}Year: {}", "• ".green(), year);
    }
    if let Some(genre) = &movie.genre {
        println!("{}Genre: {}", "• ".green(), genre);
    }
    if let Some(poster_url) = &movie.poster_url {
        println!("{}Poster: {}", "• ".green(), poster_url);
    }
    println!(
        "{}Rating: {} ({} ratings)",
        "• ".cyan(),
        movie.average_rating,
        movie.num_ratings
    );
    if let Some(description) = &movie.description {
        println!();
        println!("{}", description);
    }
    Ok(())
}

/// Handle the 'search' command
async fn handle_search(movies: &MovieRepository, query: SearchQuery) -> Result<()> {
    let criteria = validation::parse_search(query)?;
    let found = movies.search(criteria).await?;
    println!("{}", format!("Search results ({}):", found.len()).bold().blue());
    print_movies(&found);
    Ok(())
}

/// Handle the 'add' command
async fn handle_add(movies: &MovieRepository, fields: MovieFields) -> Result<()> {
    let movie = validation::validate_new(fields)?;
    let created = movies.create(movie).await?;
    println!(
        "{} Added {} ({}) as movie {}",
        "✓".green(),
        created.title,
        created.director,
        created.id
    );
    Ok(())
}

/// Handle the 'rate' command
async fn handle_rate(ratings: &RatingAggregator, id: MovieId, rating: i64) -> Result<()> {
    let rating = Rating::try_from(rating)?;
    let outcome = ratings.submit_rating(id, rating).await?;
    println!(
        "{} Movie {} now averages {} over {} ratings",
        "✓".green(),
        id,
        outcome.new_average,
        outcome.new_count
    );
    Ok(())
}

/// Handle the 'benchmark' command
async fn handle_benchmark(
    movies: &MovieRepository,
    ratings: &RatingAggregator,
    requests: usize,
    concurrent: usize,
) -> Result<()> {
    ensure!(requests > 0, "--requests must be at least 1");
    ensure!(concurrent > 0, "--concurrent must be at least 1");

    // Scratch movie so the benchmark starts from an empty aggregate
    let scratch = validation::validate_new(MovieFields {
        title: Some(format!("benchmark-{}", rand::random::<u32>())),
        director: Some("reel-catalog benchmark".to_string()),
        ..Default::default()
    })?;
    let movie = movies.create(scratch).await?;
    info!("Created scratch movie {} for benchmark", movie.id);
    println!(
        "Submitting {} ratings to movie {} with {} in flight...",
        requests, movie.id, concurrent
    );

    let values: Vec<Rating> = (0..requests)
        .map(|_| Rating::try_from(rand::random_range(1..=5i64)))
        .collect::<catalog::Result<_>>()?;

    let limit = Arc::new(Semaphore::new(concurrent));
    let started = Instant::now();
    let mut handles = vec![];
    for rating in values.iter().copied() {
        let ratings = ratings.clone();
        let limit = limit.clone();
        let id = movie.id;
        handles.push(tokio::spawn(async move {
            let _permit = limit.acquire_owned().await?;
            let start = Instant::now();
            ratings.submit_rating(id, rating).await?;
            Ok::<_, anyhow::Error>(start.elapsed())
        }));
    }

    let mut timings = vec![];
    for handle in handles {
        timings.push(handle.await??);
    }
    let wall_time = started.elapsed();
    info!("Submitted {} ratings in {:?}", timings.len(), wall_time);

    let aggregate = ratings.aggregate(movie.id).await?;
    let expected = RatingAggregate::from_ratings(values.iter().copied());
    movies.delete(movie.id).await?;
    debug!("Removed scratch movie {}", movie.id);

    timings.sort();
    let total: Duration = timings.iter().sum();
    let avg_latency = total / timings.len() as u32;
    let throughput = requests as f64 / wall_time.as_secs_f64();

    println!("{}", "Benchmark results:".bold().blue());
    println!("Total time: {:?}", wall_time);
    println!("Average latency: {:?}", avg_latency);
    println!("P50 latency: {:?}", percentile(&timings, 0.50));
    println!("P95 latency: {:?}", percentile(&timings, 0.95));
    println!("P99 latency: {:?}", percentile(&timings, 0.99));
    println!("Throughput: {:.2} ratings/second", throughput);

    if aggregate != expected {
        return Err(anyhow!(
            "Lost updates: stored {} over {} ratings, expected {} over {}",
            aggregate.average,
            aggregate.count,
            expected.average,
            expected.count
        ));
    }
    println!(
        "{} Final aggregate {} over {} ratings matches every submission",
        "✓".green(),
        aggregate.average,
        aggregate.count
    );
    Ok(())
}

/// Nearest-rank percentile of sorted, non-empty timings
fn percentile(sorted: &[Duration], p: f64) -> Duration {
    let rank = ((sorted.len() as f64 * p).ceil() as usize).clamp(1, sorted.len());
    sorted[rank - 1]
}

/// Print one line per movie
fn print_movies(movies: &[Movie]) {
    for movie in movies {
        let year = movie
            .year
            .map(|y| y.to_string())
            .unwrap_or_else(|| "????".to_string());
        println!(
            "{}: {} ({}) - {} [{}] avg {} ({} ratings)",
            movie.id.to_string().green(),
            movie.title,
            year,
            movie.director,
            movie.genre.as_deref().unwrap_or("-"),
            movie.average_rating,
            movie.num_ratings
        );
    }
}
