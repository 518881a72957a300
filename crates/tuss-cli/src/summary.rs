use comfy_table::modifiers::{UTF8_ROUND_CORNERS, UTF8_SOLID_INNER_BORDERS};
use comfy_table::presets::{UTF8_FULL, UTF8_FULL_CONDENSED};
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use tuss_model::{Confidence, NormalizationResult};
use tuss_normalization::{ExamNormalizer, SessionReport};
use tuss_persistence::MappingCache;
use tuss_standards::{Dictionary, SourceStatus, ValidationReport};

pub fn results_table(results: &[NormalizationResult]) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Name"),
        header_cell("Standard name"),
        header_cell("TUSS"),
        header_cell("Category"),
        header_cell("Confidence"),
        header_cell("Score"),
        header_cell("Cache"),
    ]);
    apply_results_table_style(&mut table);
    align_column(&mut table, 2, CellAlignment::Right);
    align_column(&mut table, 4, CellAlignment::Center);
    align_column(&mut table, 5, CellAlignment::Right);
    align_column(&mut table, 6, CellAlignment::Center);
    for result in results {
        table.add_row(vec![
            Cell::new(&result.original_name),
            optional_cell(result.canonical_name.as_deref()),
            optional_cell(result.code.as_deref()),
            optional_cell(result.category.as_deref()),
            confidence_cell(result.confidence, result.needs_external_resolution),
            Cell::new(format!("{:.1}", result.score)),
            if result.cache_hit {
                Cell::new("✓").fg(Color::Green)
            } else {
                dim_cell("-")
            },
        ]);
    }
    table
}

pub fn report_table(report: &SessionReport) -> Table {
    let mut table = Table::new();
    table.set_header(vec![header_cell("Session"), header_cell("Count")]);
    apply_table_style(&mut table);
    align_column(&mut table, 1, CellAlignment::Right);
    for (label, count) in report.rows() {
        let color = match label {
            "Needs external resolution" | "No match" => Color::Yellow,
            _ => Color::Green,
        };
        table.add_row(vec![Cell::new(label), count_cell(count, color)]);
    }
    table
}

pub fn cache_table(cache: &MappingCache) -> Table {
    let stats = cache.stats();
    let metadata = cache.metadata();
    let mut table = Table::new();
    table.set_header(vec![header_cell("Mapping cache"), header_cell("Value")]);
    apply_table_style(&mut table);
    align_column(&mut table, 1, CellAlignment::Right);
    table.add_row(vec![
        Cell::new("Total entries").add_attribute(Attribute::Bold),
        Cell::new(stats.total_entries).add_attribute(Attribute::Bold),
    ]);
    table.add_row(vec![
        Cell::new("Exact matches"),
        count_cell(stats.exact_matches as u64, Color::Green),
    ]);
    table.add_row(vec![
        Cell::new("Fuzzy matches"),
        count_cell(stats.fuzzy_matches as u64, Color::Green),
    ]);
    table.add_row(vec![
        Cell::new("External resolutions"),
        count_cell(stats.llm_fallbacks as u64, Color::Cyan),
    ]);
    table.add_row(vec![
        Cell::new("No match"),
        count_cell(stats.no_matches as u64, Color::Yellow),
    ]);
    table.add_row(vec![
        Cell::new("Format version"),
        Cell::new(&metadata.version),
    ]);
    table.add_row(vec![
        Cell::new("Created"),
        Cell::new(metadata.created_at.format("%Y-%m-%d %H:%M UTC")),
    ]);
    table.add_row(vec![
        Cell::new("Updated"),
        Cell::new(metadata.updated_at.format("%Y-%m-%d %H:%M UTC")),
    ]);
    table
}

pub fn source_status_table(status: &SourceStatus, dictionary: &Dictionary) -> Table {
    let mut table = Table::new();
    table.set_header(vec![header_cell("Dictionary"), header_cell("Value")]);
    apply_table_style(&mut table);
    table.add_row(vec![Cell::new("Source"), Cell::new(status.origin)]);
    table.add_row(vec![Cell::new("Published version"), Cell::new(&status.version)]);
    table.add_row(vec![
        Cell::new("Content hash"),
        Cell::new(short_hash(&dictionary.version)),
    ]);
    table.add_row(vec![Cell::new("Exams"), Cell::new(status.total_exams)]);
    table.add_row(vec![
        Cell::new("Skipped entries"),
        count_cell(dictionary.skipped_records as u64, Color::Yellow),
    ]);
    table.add_row(vec![
        Cell::new("Cache age"),
        match status.cache_age {
            Some(_) => Cell::new(format!("{:.2} h", status.cache_age_hours())),
            None => dim_cell("-"),
        },
    ]);
    table.add_row(vec![Cell::new("URL"), Cell::new(&status.remote_url)]);
    table
}

pub fn print_validation(report: &ValidationReport) {
    let mut table = Table::new();
    table.set_header(vec![header_cell("Check"), header_cell("Result")]);
    apply_table_style(&mut table);
    align_column(&mut table, 1, CellAlignment::Right);
    table.add_row(vec![Cell::new("Entries"), Cell::new(report.total_entries)]);
    table.add_row(vec![
        Cell::new("Without aliases"),
        count_cell(report.entries_without_aliases as u64, Color::Yellow),
    ]);
    table.add_row(vec![
        Cell::new("Duplicate codes"),
        count_cell(report.duplicate_codes.len() as u64, Color::Yellow),
    ]);
    table.add_row(vec![
        Cell::new("Duplicate aliases"),
        count_cell(report.duplicate_aliases.len() as u64, Color::Yellow),
    ]);
    table.add_row(vec![
        Cell::new("Errors").add_attribute(Attribute::Bold),
        count_cell(report.errors.len() as u64, Color::Red).add_attribute(Attribute::Bold),
    ]);
    println!("{table}");

    if !report.duplicate_codes.is_empty() {
        println!();
        println!("Duplicate codes:");
        for duplicate in &report.duplicate_codes {
            println!(
                "- {} (entries {} and {})",
                duplicate.code, duplicate.first_entry, duplicate.duplicate_entry
            );
        }
    }
    if !report.duplicate_aliases.is_empty() {
        println!();
        println!("Aliases claimed by more than one entry:");
        for (alias, entries) in &report.duplicate_aliases {
            let entries: Vec<String> = entries.iter().map(ToString::to_string).collect();
            println!("- {alias}: entries {}", entries.join(", "));
        }
    }
    if !report.errors.is_empty() {
        eprintln!("Errors:");
        for error in &report.errors {
            eprintln!("- {error}");
        }
    }
}

/// Print a resolution prompt for every result still needing one.
pub fn print_prompts(engine: &ExamNormalizer, results: &[NormalizationResult]) {
    for result in results.iter().filter(|r| r.needs_external_resolution) {
        println!();
        println!("{}", engine.resolution_prompt(&result.original_name, result.score));
    }
}

fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(100);
}

fn apply_results_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .apply_modifier(UTF8_SOLID_INNER_BORDERS)
        .set_content_arrangement(ContentArrangement::DynamicFullWidth)
        .set_width(160);
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

fn confidence_cell(confidence: Confidence, needs_external: bool) -> Cell {
    let cell = Cell::new(confidence.as_str());
    match confidence {
        Confidence::Exact => cell.fg(Color::Green).add_attribute(Attribute::Bold),
        Confidence::Fuzzy if needs_external => cell.fg(Color::Yellow),
        Confidence::Fuzzy => cell.fg(Color::Green),
        Confidence::Llm => cell.fg(Color::Cyan),
        Confidence::NoMatch => cell.fg(Color::Red),
    }
}

fn count_cell(count: u64, color: Color) -> Cell {
    if count > 0 {
        Cell::new(count).fg(color).add_attribute(Attribute::Bold)
    } else {
        dim_cell(count)
    }
}

fn optional_cell(value: Option<&str>) -> Cell {
    match value {
        Some(value) => Cell::new(value),
        None => dim_cell("-"),
    }
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}

fn short_hash(hash: &str) -> &str {
    hash.get(..12).unwrap_or(hash)
}
