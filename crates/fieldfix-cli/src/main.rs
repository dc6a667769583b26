use std::io::{self, ErrorKind, Write};
use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use fieldfix_contracts::chat::{parse_intent, CHAT_HELP_COMMANDS};
use fieldfix_contracts::{
    BomItem, Domain, ImageAttachment, Language, ProblemRequest, SolutionRecord,
};
use fieldfix_engine::{load_attachment, AssessmentEngine, EngineConfig, SolveOutcome};
use serde_json::Value;

#[derive(Debug, Parser)]
#[command(name = "fieldfix", version, about = "Field engineering troubleshooting assistant")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    Chat(ChatArgs),
    Solve(SolveArgs),
}

#[derive(Debug, Parser)]
struct ChatArgs {
    #[arg(long, default_value = "mechanical")]
    field: Domain,
    #[arg(long, default_value = "en")]
    lang: Language,
    #[arg(long)]
    model: Option<String>,
    #[arg(long)]
    events: Option<PathBuf>,
}

#[derive(Debug, Parser)]
struct SolveArgs {
    #[arg(long)]
    field: Domain,
    #[arg(long)]
    prompt: String,
    #[arg(long)]
    image: Option<PathBuf>,
    #[arg(long, default_value = "en")]
    lang: Language,
    /// Also generate the bill of materials.
    #[arg(long)]
    bom: bool,
    /// Print the record as JSON instead of the dashboard.
    #[arg(long)]
    json: bool,
    #[arg(long)]
    model: Option<String>,
    #[arg(long)]
    events: Option<PathBuf>,
}

const HISTORY_QUERY_MAX_CHARS: usize = 60;

fn main() {
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("fieldfix error: {err:#}");
            std::process::exit(1);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    match cli.command {
        Command::Chat(args) => {
            run_chat(args)?;
            Ok(0)
        }
        Command::Solve(args) => run_solve(args),
    }
}

fn engine_config(model: Option<String>, events: Option<PathBuf>) -> EngineConfig {
    let mut config = EngineConfig::from_env();
    if model.is_some() {
        config.text_model = model;
    }
    if events.is_some() {
        config.events_path = events;
    }
    config
}

fn run_chat(args: ChatArgs) -> Result<()> {
    let mut engine = AssessmentEngine::new(engine_config(args.model, args.events))?;
    let mut field = args.field;
    let mut language = args.lang;
    let mut image: Option<ImageAttachment> = None;

    let stdin = io::stdin();
    let mut line = String::new();

    println!("fieldfix chat started ({field}, {}). Type /help for commands.", language.display_name());

    loop {
        print!("> ");
        io::stdout().flush()?;

        line.clear();
        let read = match stdin.read_line(&mut line) {
            Ok(read) => read,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(err.into()),
        };
        if read == 0 {
            break;
        }

        let input = line.trim_end_matches(['\n', '\r']);
        let intent = parse_intent(input);
        match intent.action.as_str() {
            "noop" => continue,
            "help" => {
                println!("Commands: {}", CHAT_HELP_COMMANDS.join(" "));
                println!("Anything else is sent as a {field} problem description.");
            }
            "quit" => break,
            "solve" => {
                let prompt = intent.prompt.clone().unwrap_or_default();
                let request = ProblemRequest::new(field, prompt)
                    .with_language(language)
                    .with_image(image.clone());
                println!("Assessing...");
                match engine.solve(request) {
                    Ok(outcome) => print_outcome(&engine, &outcome),
                    Err(err) => print_action_error(&err),
                }
            }
            "set_field" => match intent.arg("field").map(str::parse::<Domain>) {
                Some(Ok(value)) => {
                    field = value;
                    println!("Field set to {field}");
                }
                Some(Err(err)) => println!("{err}"),
                None => println!("Field: {field}"),
            },
            "set_language" => match intent.arg("language").map(str::parse::<Language>) {
                Some(Ok(value)) => {
                    language = value;
                    println!("Language set to {}", language.display_name());
                }
                Some(Err(err)) => println!("{err}"),
                None => println!("Language: {}", language.display_name()),
            },
            "toggle_language" => {
                let outcome = engine.toggle_language();
                language = engine
                    .last_request()
                    .map(|request| request.language)
                    .unwrap_or_else(|| language.toggled());
                println!("Language set to {}", language.display_name());
                match outcome {
                    Ok(SolveOutcome::Skipped) => {}
                    Ok(outcome) => print_outcome(&engine, &outcome),
                    Err(err) => print_action_error(&err),
                }
            }
            "set_model" => {
                let Some(model) = intent.arg("model") else {
                    println!("Model: {}", engine.text_model().unwrap_or("default"));
                    continue;
                };
                engine.set_text_model(Some(model.to_string()));
                println!("Model set to {model}");
            }
            "attach_image" => {
                let Some(path) = intent.arg("path") else {
                    println!("/attach requires a path");
                    continue;
                };
                match load_attachment(&PathBuf::from(path)) {
                    Ok(attachment) => {
                        println!("Attached {}", attachment.label());
                        image = Some(attachment);
                    }
                    Err(err) => println!("Attach failed: {err:#}"),
                }
            }
            "detach_image" => {
                if image.take().is_some() {
                    println!("Image detached");
                } else {
                    println!("No image attached");
                }
            }
            "bill_of_materials" => {
                let id = intent
                    .arg("id")
                    .map(str::to_string)
                    .or_else(|| engine.current().map(|record| record.id.clone()));
                let Some(id) = id else {
                    println!("No current result; describe a problem first.");
                    continue;
                };
                println!("Generating bill of materials...");
                match engine.generate_bill_of_materials(&id) {
                    Ok(items) => {
                        let language = engine
                            .store()
                            .get(&id)
                            .map(|record| record.language)
                            .unwrap_or(language);
                        print!("{}", render_bom(&items, labels(language)));
                    }
                    Err(err) => print_action_error(&err),
                }
            }
            "history" => {
                let current_id = engine.current().map(|record| record.id.as_str());
                print!("{}", render_history(engine.history(), current_id, language));
            }
            "reopen" => {
                let Some(id) = intent.arg("id") else {
                    println!("/open requires a record id (see /history)");
                    continue;
                };
                match engine.reopen(id) {
                    Ok(record) => {
                        field = record.field;
                        language = record.language;
                        image = record.image.clone();
                        print!("{}", render_dashboard(&record, engine.safety_banner(&record)));
                    }
                    Err(err) => print_action_error(&err),
                }
            }
            "show" => match engine.current() {
                Some(record) => {
                    print!("{}", render_dashboard(record, engine.safety_banner(record)))
                }
                None => println!("No current result."),
            },
            "unknown" => {
                let command = intent
                    .command_args
                    .get("command")
                    .and_then(Value::as_str)
                    .unwrap_or_default();
                println!("Unknown command: /{command}. Type /help for commands.");
            }
            other => println!("Unhandled action: {other}"),
        }
    }

    Ok(())
}

fn run_solve(args: SolveArgs) -> Result<i32> {
    let mut engine = AssessmentEngine::new(engine_config(args.model, args.events))?;
    let image = args.image.as_deref().map(load_attachment).transpose()?;
    let request = ProblemRequest::new(args.field, args.prompt)
        .with_language(args.lang)
        .with_image(image);

    let record = match engine.solve(request) {
        Ok(SolveOutcome::Recorded(record)) => *record,
        Ok(SolveOutcome::Skipped) => {
            eprintln!("Nothing to assess: --prompt is blank.");
            return Ok(1);
        }
        Ok(SolveOutcome::Stale) => {
            eprintln!("Assessment was superseded by a newer one.");
            return Ok(1);
        }
        Err(err) => {
            print_action_error(&err);
            return Ok(1);
        }
    };
    if let Some(reason) = engine.last_fallback_reason() {
        eprintln!("Note: {reason}");
    }

    let mut code = 0;
    if args.bom {
        if let Err(err) = engine.generate_bill_of_materials(&record.id) {
            print_action_error(&err);
            code = 1;
        }
    }

    let Some(record) = engine.store().get(&record.id) else {
        return Ok(1);
    };
    if args.json {
        println!("{}", serde_json::to_string_pretty(record)?);
    } else {
        print!("{}", render_dashboard(record, engine.safety_banner(record)));
    }
    Ok(code)
}

fn print_outcome(engine: &AssessmentEngine, outcome: &SolveOutcome) {
    if let Some(reason) = engine.last_fallback_reason() {
        println!("Note: {reason}");
    }
    match outcome {
        SolveOutcome::Recorded(record) => {
            print!("{}", render_dashboard(record, engine.safety_banner(record)));
        }
        SolveOutcome::Skipped => println!("Describe the problem first."),
        SolveOutcome::Stale => println!("A newer assessment replaced this one."),
    }
}

fn print_action_error(err: &fieldfix_contracts::AssessmentError) {
    println!("{err}");
    eprintln!("fieldfix: {} error: {}", err.kind_label(), err.detail());
}

struct Labels {
    analysis: &'static str,
    safety: &'static str,
    clarifications: &'static str,
    diagnostics: &'static str,
    test: &'static str,
    steps: &'static str,
    scope: &'static str,
    time: &'static str,
    follow_up_24h: &'static str,
    follow_up_7d: &'static str,
    variables: &'static str,
    bom: &'static str,
    bom_hint: &'static str,
    final_result: &'static str,
    confidence: &'static str,
    history_empty: &'static str,
}

const EN_LABELS: Labels = Labels {
    analysis: "Analysis",
    safety: "SAFETY",
    clarifications: "Clarification questions",
    diagnostics: "Diagnostic tree",
    test: "test",
    steps: "Steps",
    scope: "Project scope",
    time: "Estimated time",
    follow_up_24h: "24-hour follow-up",
    follow_up_7d: "7-day follow-up",
    variables: "Variables",
    bom: "Bill of materials",
    bom_hint: "No bill of materials yet. Run /bom to generate one.",
    final_result: "Final result",
    confidence: "confidence",
    history_empty: "No assessments yet.",
};

const SW_LABELS: Labels = Labels {
    analysis: "Uchambuzi",
    safety: "USALAMA",
    clarifications: "Maswali ya ufafanuzi",
    diagnostics: "Mti wa uchunguzi",
    test: "jaribio",
    steps: "Hatua",
    scope: "Upeo wa kazi",
    time: "Muda unaokadiriwa",
    follow_up_24h: "Ufuatiliaji saa 24",
    follow_up_7d: "Ufuatiliaji siku 7",
    variables: "Vigezo",
    bom: "Orodha ya vifaa",
    bom_hint: "Bado hakuna orodha ya vifaa. Tumia /bom kuitengeneza.",
    final_result: "Matokeo",
    confidence: "uhakika",
    history_empty: "Bado hakuna tathmini.",
};

fn labels(language: Language) -> &'static Labels {
    match language {
        Language::En => &EN_LABELS,
        Language::Sw => &SW_LABELS,
    }
}

fn confidence_percent(confidence: f64) -> i64 {
    (confidence * 100.0).round() as i64
}

fn push_section(out: &mut String, title: &str) {
    out.push('\n');
    out.push_str(title);
    out.push('\n');
}

fn push_list(out: &mut String, title: &str, items: &[String], numbered: bool) {
    if items.is_empty() {
        return;
    }
    push_section(out, title);
    for (index, item) in items.iter().enumerate() {
        if numbered {
            out.push_str(&format!("  {}. {item}\n", index + 1));
        } else {
            out.push_str(&format!("  [ ] {item}\n"));
        }
    }
}

/// Renders one record. `safety` is the banner text, already filtered by the classifier.
fn render_dashboard(record: &SolutionRecord, safety: Option<&str>) -> String {
    let labels = labels(record.language);
    let result = &record.result;
    let mut out = String::new();

    out.push_str(&format!(
        "=== {} | {} | {} | {}% {} ===\n",
        record.id,
        record.field,
        record.model,
        confidence_percent(result.confidence),
        labels.confidence,
    ));
    if let Some(image) = record.image.as_ref() {
        out.push_str(&format!("[{}]\n", image.label()));
    }
    if let Some(safety) = safety {
        out.push_str(&format!("!! {}: {safety}\n", labels.safety));
    }

    push_section(&mut out, labels.analysis);
    out.push_str(&format!("  {}\n", result.analysis.trim()));

    push_list(&mut out, labels.clarifications, &result.clarification_questions, false);

    if !result.diagnostic_tree.is_empty() {
        push_section(&mut out, labels.diagnostics);
        for (index, node) in result.diagnostic_tree.iter().enumerate() {
            out.push_str(&format!("  {}. {}\n", index + 1, node.hypothesis));
            out.push_str(&format!("     {}: {}\n", labels.test, node.test));
        }
    }

    push_list(&mut out, labels.steps, &result.steps, true);

    let scope_rows: Vec<(&str, &str)> = [
        (labels.scope, result.project_scope_confirm.as_deref()),
        (labels.time, result.time_to_complete.as_deref()),
    ]
    .into_iter()
    .filter_map(|(label, value)| {
        value
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(|value| (label, value))
    })
    .collect();
    if !scope_rows.is_empty() {
        out.push('\n');
        for (label, value) in scope_rows {
            out.push_str(&format!("{label}: {value}\n"));
        }
    }

    push_list(&mut out, labels.follow_up_24h, &result.follow_up_24h, false);
    push_list(&mut out, labels.follow_up_7d, &result.follow_up_7d, false);

    if !result.variables.is_empty() {
        push_section(&mut out, labels.variables);
        let width = result
            .variables
            .keys()
            .map(|key| key.chars().count())
            .max()
            .unwrap_or(0);
        for (key, value) in &result.variables {
            out.push_str(&format!("  {key:<width$}  {value}\n"));
        }
    }

    match record.bill_of_materials.as_deref() {
        Some(items) => out.push_str(&render_bom(items, labels)),
        None => {
            out.push('\n');
            out.push_str(labels.bom_hint);
            out.push('\n');
        }
    }

    if let Some(final_result) = result
        .final_result
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
    {
        push_section(&mut out, labels.final_result);
        out.push_str(&format!("  {final_result}\n"));
    }

    out
}

fn render_bom(items: &[BomItem], labels: &Labels) -> String {
    let mut out = String::new();
    push_section(&mut out, labels.bom);
    if items.is_empty() {
        out.push_str("  -\n");
        return out;
    }
    let name_width = items
        .iter()
        .map(|item| item.item_name.chars().count())
        .max()
        .unwrap_or(0);
    for item in items {
        out.push_str(&format!(
            "  [{:<6}] {:<name_width$}  x{}  {}\n",
            item.priority.to_string(),
            item.item_name,
            item.quantity,
            item.specification,
        ));
    }
    out
}

/// One line per record, most recent first; `*` marks the current one.
fn render_history(
    records: &[SolutionRecord],
    current_id: Option<&str>,
    language: Language,
) -> String {
    if records.is_empty() {
        return format!("{}\n", labels(language).history_empty);
    }
    let mut out = String::new();
    for record in records {
        let marker = if Some(record.id.as_str()) == current_id {
            '*'
        } else {
            ' '
        };
        let bom = if record.bill_of_materials.is_some() {
            " [BOM]"
        } else {
            ""
        };
        out.push_str(&format!(
            "{marker} {}  {:<10} {}  {}{bom}\n",
            record.id,
            record.field.as_str(),
            record.language.code(),
            clamp_text(&record.query, HISTORY_QUERY_MAX_CHARS),
        ));
    }
    out
}

fn clamp_text(text: &str, max_chars: usize) -> String {
    let single_line = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if single_line.chars().count() <= max_chars {
        return single_line;
    }
    let mut clamped: String = single_line.chars().take(max_chars.saturating_sub(1)).collect();
    clamped.push('…');
    clamped
}

#[cfg(test)]
mod tests {
    use fieldfix_contracts::{
        BomItem, BomPriority, Domain, Language, ProblemRequest, SolutionRecord, SolveResult,
    };
    use serde_json::json;

    use super::{clamp_text, render_dashboard, render_history};

    fn record(id: &str, language: Language) -> SolutionRecord {
        let result: SolveResult = serde_json::from_value(json!({
            "analysis": "Cooling fan seized.",
            "safetyCheck": "Isolate the feeder.",
            "diagnosticTree": [{"hypothesis": "Fan seized", "test": "Spin by hand"}],
            "followUp24h": ["Check top-oil temperature"],
            "timeToComplete": "3 hours",
            "steps": ["Isolate", "Replace fan"],
            "variables": {"Top oil": "95 C", "Load": "80%"},
            "finalResult": "Temperature back under 75 C.",
            "confidence": 0.876
        }))
        .unwrap();
        SolutionRecord::new(
            id,
            &ProblemRequest::new(Domain::Electrical, "transformer overheating")
                .with_language(language),
            "gemini-2.5-flash",
            result,
        )
    }

    #[test]
    fn dashboard_shows_sections_and_rounded_confidence() {
        let rendered = render_dashboard(&record("sol-1", Language::En), None);
        assert!(rendered.starts_with("=== sol-1 | Electrical | gemini-2.5-flash | 88% confidence ==="));
        assert!(rendered.contains("\nAnalysis\n  Cooling fan seized.\n"));
        assert!(rendered.contains("  1. Fan seized\n     test: Spin by hand\n"));
        assert!(rendered.contains("  2. Replace fan\n"));
        assert!(rendered.contains("Estimated time: 3 hours\n"));
        assert!(rendered.contains("  [ ] Check top-oil temperature\n"));
        assert!(rendered.contains("Run /bom to generate one."));
        assert!(rendered.contains("Final result\n  Temperature back under 75 C.\n"));
        assert!(!rendered.contains("Project scope"));
    }

    #[test]
    fn safety_banner_only_when_given() {
        let record = record("sol-1", Language::En);
        assert!(!render_dashboard(&record, None).contains("SAFETY"));
        assert!(render_dashboard(&record, Some("Isolate the feeder."))
            .contains("!! SAFETY: Isolate the feeder.\n"));
    }

    #[test]
    fn swahili_records_use_swahili_labels() {
        let mut record = record("sol-2", Language::Sw);
        record.bill_of_materials = Some(vec![BomItem {
            item_name: "Fan motor".to_string(),
            specification: "400V".to_string(),
            quantity: "1".to_string(),
            priority: BomPriority::High,
        }]);
        let rendered = render_dashboard(&record, Some("Tenga umeme."));
        assert!(rendered.contains("\nUchambuzi\n"));
        assert!(rendered.contains("\nHatua\n"));
        assert!(rendered.contains("!! USALAMA: Tenga umeme."));
        assert!(rendered.contains("\nOrodha ya vifaa\n"));
        assert!(rendered.contains("Fan motor  x1  400V"));
        assert!(rendered.contains("88% uhakika"));
        assert!(!rendered.contains("/bom"));
    }

    #[test]
    fn history_lists_records_in_given_order_and_marks_current() {
        let records = vec![record("sol-b", Language::Sw), record("sol-a", Language::En)];
        let rendered = render_history(&records, Some("sol-a"), Language::En);
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("  sol-b"));
        assert!(lines[0].contains(" sw "));
        assert!(lines[1].starts_with("* sol-a"));
        assert_eq!(render_history(&[], None, Language::En), "No assessments yet.\n");
        assert_eq!(
            render_history(&[], None, Language::Sw),
            "Bado hakuna tathmini.\n"
        );
    }

    #[test]
    fn clamp_text_flattens_and_truncates() {
        assert_eq!(clamp_text("pump\n  cavitation", 40), "pump cavitation");
        assert_eq!(clamp_text("abcdefghij", 5), "abcd…");
    }
}
