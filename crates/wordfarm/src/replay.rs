use serde::Serialize;
use std::path::Path;
use wordfarm_core::{
    config::WallConfig,
    feed::{FeedDiff, Snapshot},
    post::PostRecord,
    render::Unit,
    session::{FeedSession, FeedUpdate},
    WallError,
};

/// One revealed unit of the tail, as printed by `replay --json`.
#[derive(Debug, Serialize)]
struct RevealedUnit {
    index: usize,
    delay_ms: u128,
    text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    link: Option<String>,
}

#[derive(Debug, Serialize)]
struct ReplayStep<'a> {
    snapshot: usize,
    posts: usize,
    diff: &'a FeedDiff,
    #[serde(skip_serializing_if = "Option::is_none")]
    from_offset: Option<usize>,
    revealed: Vec<RevealedUnit>,
}

pub async fn run(config: &WallConfig, file: &Path, json: bool) -> anyhow::Result<()> {
    let content = tokio::fs::read_to_string(file).await.map_err(|e| {
        WallError::custom_error(format!("Unable to read {}: {e}", file.display()))
    })?;
    let snapshots = serde_json::from_str::<Vec<Vec<PostRecord>>>(&content)?;

    let mut session = FeedSession::new(config)?;
    for (n, records) in snapshots.into_iter().enumerate() {
        let update = session.apply_snapshot(Snapshot::from_records(records));
        let step = replay_step(n, &update);
        if json {
            println!("{}", serde_json::to_string(&step)?);
        } else {
            print_step(&step);
        }
    }
    Ok(())
}

fn replay_step(n: usize, update: &FeedUpdate) -> ReplayStep<'_> {
    let revealed = update
        .tail()
        .map(|tail| {
            tail.pending()
                .map(|unit| match unit {
                    Unit::Char { ch, index, reveal } => RevealedUnit {
                        index: *index,
                        delay_ms: reveal.delay().as_millis(),
                        text: ch.to_string(),
                        link: None,
                    },
                    Unit::Link {
                        text,
                        target,
                        index,
                        reveal,
                    } => RevealedUnit {
                        index: *index,
                        delay_ms: reveal.delay().as_millis(),
                        text: text.clone(),
                        link: Some(target.clone()),
                    },
                })
                .collect()
        })
        .unwrap_or_default();

    ReplayStep {
        snapshot: n,
        posts: update.posts.len(),
        diff: &update.diff,
        from_offset: update.tail_plan.as_ref().map(|plan| plan.from_offset()),
        revealed,
    }
}

fn print_step(step: &ReplayStep<'_>) {
    println!("#{} ({} posts): {}", step.snapshot, step.posts, step.diff);
    for unit in &step.revealed {
        match &unit.link {
            Some(target) => println!("  {:>6}ms  {} -> {target}", unit.delay_ms, unit.text),
            None => println!("  {:>6}ms  {:?}", unit.delay_ms, unit.text),
        }
    }
}
