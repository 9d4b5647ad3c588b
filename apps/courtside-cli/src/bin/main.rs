use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

use courtside_cli::{build_models, build_pipeline, build_structured, init_tracing, pattern_table, Command};
use courtside_core::config::Config;
use courtside_core::types::{CitationKind, Query, StructuredStatus};
use courtside_route::{categorize, expand, Classifier};

fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::with_template("{spinner:.cyan} {msg}").unwrap_or_else(|_| ProgressStyle::default_spinner()));
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = match Command::parse(&args) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{e:#}");
            std::process::exit(1);
        }
    };
    let config = Config::load().map_err(|e| {
        eprintln!("Error loading config: {e}");
        e
    })?;
    let settings = config.settings()?;

    match command {
        Command::Classify { question } => {
            let classifier = Classifier::new(pattern_table(&settings)?);
            let decision = classifier.classify(&question);
            println!("route:      {}", decision.kind);
            println!("category:   {}", categorize(&question, &decision));
            println!("paths:      {}", decision.initial_paths());
            println!("scores:     statistical={:.1} contextual={:.1} linked={}", decision.statistical_score, decision.contextual_score, decision.linked);
            for s in &decision.signals {
                println!("  {:?}: {}", s.family, s.term);
            }
        }
        Command::Expand { question } => {
            let e = expand(&question);
            if e.is_empty() {
                println!("(no expansion)");
            } else {
                println!("added: {}", e.expansions.join(", "));
            }
            println!("embedding text: {}", e.embedding_text());
        }
        Command::Sql { question } => {
            let (_, sql_model) = build_models(&settings)?;
            let engine = build_structured(&settings, pattern_table(&settings)?, sql_model)?;
            let pb = spinner("generating sql...");
            let result = engine.generate_and_run(&question, &settings.schema, &[]).await;
            pb.finish_and_clear();
            let result = result?;
            println!("{}", result.query);
            match &result.status {
                StructuredStatus::Error(reason) => println!("error: {reason}"),
                StructuredStatus::Ok | StructuredStatus::Empty => {
                    for (i, row) in result.rows.iter().enumerate() {
                        let cells: Vec<String> = row.cells.iter().map(|(c, v)| format!("{c}={v}")).collect();
                        println!("[R{}] {}", i + 1, cells.join("  "));
                    }
                    println!("({} rows)", result.rows.len());
                }
            }
        }
        Command::Ask { question, conversation, turn, json } => {
            let pipeline = build_pipeline(&settings).await?;
            let mut query = Query::new(question);
            if let Some(id) = conversation {
                query = query.in_conversation(id, turn);
            }
            let pb = spinner("thinking...");
            let response = pipeline.route_and_answer(&query).await;
            pb.finish_and_clear();
            let response = response?;
            if json {
                println!("{}", serde_json::to_string_pretty(&response)?);
                return Ok(());
            }
            println!("{}\n", response.answer_text);
            for c in &response.sources_used {
                match c.kind {
                    CitationKind::Row => println!("  [R{}] stats row", c.index),
                    CitationKind::Source => println!("  [S{}] {}", c.index, c.source_id.as_deref().unwrap_or("?")),
                }
            }
            println!(
                "\nroute={} paths={} attempts={} fallback={} refused={} degraded={} latency={}ms",
                response.routing_used,
                response.paths_used,
                response.attempts,
                response.fallback_triggered,
                response.refused,
                response.degraded,
                response.latency_ms
            );
        }
    }
    Ok(())
}
