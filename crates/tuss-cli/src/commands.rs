use anyhow::{Context, Result, bail};
use tracing::{info, info_span, trace, warn};

use tuss_cli::batch::{read_records, write_records};
use tuss_cli::logging::redact_value;
use tuss_model::NormalizationResult;
use tuss_normalization::{
    ExamNormalizer, FlushStatus, LocalContributionQueue, NormalizeError, NormalizerConfig,
    SessionReport,
};
use tuss_persistence::MappingCache;
use tuss_standards::{
    Dictionary, DictionarySource, FileDictionarySource, InMemoryDictionarySource, RemoteConfig,
    RemoteDictionarySource, ValidationReport, validate_file,
};

use crate::cli::{
    BatchArgs, CacheArgs, DictArgs, DictionaryArgs, EngineArgs, NormalizeArgs, RemoteArgs,
    ResolveArgs, ValidateArgs,
};
use crate::summary::{
    cache_table, print_prompts, report_table, results_table, source_status_table,
};

pub fn run_normalize(args: &NormalizeArgs) -> Result<()> {
    let mut engine = build_engine(&args.engine)?;
    let span = info_span!("normalize", names = args.names.len());
    let _guard = span.enter();

    let results: Vec<NormalizationResult> = args
        .names
        .iter()
        .map(|name| {
            trace!(name = redact_value(name), "normalizing");
            engine.normalize_one(name)
        })
        .collect();
    engine.save().map_err(|e| cache_failure(e, "save mapping cache"))?;

    if args.json {
        let text = serde_json::to_string_pretty(&results).context("serialize results")?;
        println!("{text}");
    } else {
        println!("{}", results_table(&results));
        println!("{}", report_table(&engine.report()));
    }
    if args.prompt {
        print_prompts(&engine, &results);
    }
    Ok(())
}

/// Normalize a batch file. Records are written even when the cache save fails.
pub fn run_batch(args: &BatchArgs) -> Result<SessionReport> {
    let mut records = read_records(&args.input)?;
    let mut engine = build_engine(&args.engine)?;
    let span = info_span!("batch", records = records.len());
    let _guard = span.enter();

    let saved = engine.normalize_batch(&mut records);
    write_records(&records, args.output.as_deref())?;
    saved.map_err(|e| cache_failure(e, "save mapping cache"))?;
    Ok(engine.report())
}

pub fn run_resolve(args: &ResolveArgs) -> Result<()> {
    let mut engine = build_engine(&args.engine)?;
    if let Some(path) = &args.contrib {
        engine = engine.with_contributions(LocalContributionQueue::new(path));
    }

    let applied = engine.apply_external_result(
        &args.original,
        &args.resolved,
        args.code.as_deref(),
        &args.portal,
    );
    if let Err(error) = applied {
        // The contribution is queued even when the cache save failed.
        if matches!(error, NormalizeError::Cache(_)) {
            let flush = engine.flush_contributions();
            if matches!(flush.status, FlushStatus::Error) {
                warn!(message = %flush.message, "contributions not written");
            }
        }
        return Err(cache_failure(error, "record external resolution"));
    }
    trace!(
        original = redact_value(&args.original),
        resolved = redact_value(&args.resolved),
        "external resolution cached"
    );
    println!("Cached: {} -> {}", args.original, args.resolved);

    let flush = engine.flush_contributions();
    match flush.status {
        FlushStatus::Disabled => {}
        FlushStatus::Success | FlushStatus::Skipped => println!("Contributions: {}", flush.message),
        FlushStatus::Error => bail!("flush contributions: {}", flush.message),
    }
    Ok(())
}

pub fn run_cache_stats(args: &CacheArgs) -> Result<()> {
    let cache = MappingCache::load(&args.cache);
    println!("Cache: {}", cache.path().display());
    println!("{}", cache_table(&cache));
    Ok(())
}

pub fn run_validate(args: &ValidateArgs) -> Result<ValidationReport> {
    let report = validate_file(&args.dict)
        .with_context(|| format!("validate {}", args.dict.display()))?;
    info!(
        entries = report.total_entries,
        errors = report.errors.len(),
        "dictionary validated"
    );
    Ok(report)
}

pub fn run_dict(args: &DictArgs) -> Result<()> {
    let source = remote_source(&args.remote)?;
    if args.invalidate {
        source
            .invalidate_cache()
            .context("invalidate dictionary cache")?;
        println!(
            "Removed cached dictionary from {}",
            source.config().cache_dir.display()
        );
        return Ok(());
    }

    let blob = source
        .fetch(args.remote.refresh)
        .context("fetch dictionary")?;
    let dictionary = Dictionary::from_blob(blob);
    let Some(status) = source.status() else {
        bail!("dictionary fetched but no status was recorded");
    };
    println!("{}", source_status_table(&status, &dictionary));
    Ok(())
}

/// Attach the cache's own message and remediation hint to a save failure.
fn cache_failure(error: NormalizeError, action: &'static str) -> anyhow::Error {
    match error {
        NormalizeError::Cache(error) => {
            let message = match error.suggestion() {
                Some(hint) => format!("{} {hint}", error.user_message()),
                None => error.user_message(),
            };
            anyhow::Error::new(error).context(message)
        }
        other => anyhow::Error::new(other).context(action),
    }
}

fn build_engine(args: &EngineArgs) -> Result<ExamNormalizer> {
    let config = NormalizerConfig::new()
        .with_fuzzy_threshold(args.threshold)
        .with_llm_threshold(args.llm_threshold)
        .with_top_n(args.top_n)
        .with_cache_path(&args.cache);
    let source = dictionary_source(&args.dictionary)?;
    ExamNormalizer::new(&*source, config).context("initialize normalizer")
}

fn dictionary_source(args: &DictionaryArgs) -> Result<Box<dyn DictionarySource>> {
    if let Some(path) = &args.dict {
        return Ok(Box::new(FileDictionarySource::new(path)));
    }
    let remote = remote_source(&args.remote)?;
    if args.remote.refresh {
        let blob = remote.fetch(true).context("refresh dictionary")?;
        return Ok(Box::new(InMemoryDictionarySource::new(blob)));
    }
    Ok(Box::new(remote))
}

fn remote_source(args: &RemoteArgs) -> Result<RemoteDictionarySource> {
    let mut config = RemoteConfig::default();
    if let Some(url) = &args.remote_url {
        config = config.with_url(url);
    }
    if let Some(dir) = &args.dict_cache_dir {
        config = config.with_cache_dir(dir);
    }
    if let Some(path) = &args.fallback {
        config = config.with_fallback_path(path);
    }
    RemoteDictionarySource::new(config).context("build dictionary client")
}
