use crate::typewriter::{Printer, Terminal};
use std::{path::Path, sync::Arc, time::Duration};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::{mpsc, watch},
};
use tracing::{info, warn};
use wordfarm_core::{
    compose::{Composer, CompositionBuffer, SubmitOutcome},
    config::WallConfig,
    feed::FeedDiff,
    post::{Post, PostId},
    session::{FeedSession, FeedUpdate},
    store::{FeedStore, MemoryStore, Subscription},
    WallError, WallResult,
};

const HELP: &str = "\
Type text and press enter to post it.
  /newline       toggle between new posts and extending the last one
  /image PATH    attach an image to the next post
  /delete ID     delete one of your posts
  /purge         delete every post
  /help          show this help
  /quit          leave the wall";

/// How long a submission waits to see its own write come back on the feed.
const OWN_WRITE_TIMEOUT: Duration = Duration::from_secs(2);

pub async fn run(config: WallConfig, newline: bool) -> anyhow::Result<()> {
    let (store, _handle) = MemoryStore::spawn();
    let store = Arc::new(store);
    let composer = Composer::new(store.clone());
    let mut buffer = CompositionBuffer::new(newline || config.compose.newline_enabled);

    let (tail_tx, mut tail_rx) = watch::channel::<Option<Post>>(None);
    let (update_tx, update_rx) = mpsc::unbounded_channel();
    let subscription = store.subscribe().await?;
    let session = FeedSession::new(&config)?;
    let feed_handle = tokio::spawn(follow_feed(session, subscription, tail_tx, update_tx));
    let printer_handle = tokio::spawn(print_updates(update_rx, Terminal));

    if let Some(identity) = store.current_identity().await {
        info!("Joined the wall as {identity}");
    }
    println!("{HELP}");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let (cmd, arg) = match line.split_once(' ') {
            Some((cmd, arg)) => (cmd, arg.trim()),
            None => (line.as_str(), ""),
        };
        match cmd {
            "/quit" => break,
            "/help" => println!("{HELP}"),
            "/newline" => {
                let enabled = buffer.toggle_newline();
                println!("newline mode {}", if enabled { "on" } else { "off" });
            }
            "/image" => match attach_image(&mut buffer, Path::new(arg)).await {
                Ok(()) => println!("attached {arg}"),
                Err(e) => eprintln!("ERROR: {e}"),
            },
            "/delete" => {
                if let Err(e) = composer.delete(&PostId::new(arg)).await {
                    eprintln!("ERROR during delete: {e}");
                }
            }
            "/purge" => match store.purge().await {
                Ok(removed) => info!("Purged {removed} posts"),
                Err(e) => eprintln!("ERROR during purge: {e}"),
            },
            _ => match submit_line(&composer, &mut buffer, &mut tail_rx, &line).await {
                Ok(SubmitOutcome::Skipped) => println!("nothing to post"),
                Ok(_) => {}
                Err(e) => match e.downcast_ref::<WallError>() {
                    Some(WallError::UploadFailure { .. }) => {
                        eprintln!("ERROR: {e}; nothing was posted")
                    }
                    _ => eprintln!("ERROR: {e}"),
                },
            },
        }
    }

    feed_handle.abort();
    printer_handle.abort();
    println!();
    Ok(())
}

/// Apply every snapshot as it arrives and publish the new tail. Updates go
/// to the printer over `updates`; this loop never waits for them to be
/// shown.
async fn follow_feed(
    mut session: FeedSession,
    mut subscription: Subscription,
    tail_tx: watch::Sender<Option<Post>>,
    updates: mpsc::UnboundedSender<FeedUpdate>,
) {
    loop {
        let update = match session.next_update(&mut subscription).await {
            Ok(update) => update,
            Err(e) => {
                warn!("{e}");
                break;
            }
        };
        tail_tx.send_replace(session.tail().cloned());
        // A printer that gave up does not stop the tail from being tracked.
        let _ = updates.send(update);
    }
}

/// Show updates in order. The first one shows the feed as it stands.
async fn print_updates<P: Printer>(
    mut updates: mpsc::UnboundedReceiver<FeedUpdate>,
    mut printer: P,
) {
    let mut first = true;
    while let Some(update) = updates.recv().await {
        let printed = if first && update.diff != FeedDiff::NoChange {
            printer.print_feed(&update)
        } else {
            printer.print_update(&update).await
        };
        first = false;
        if let Err(e) = printed {
            warn!("Unable to write to the terminal: {e}");
            break;
        }
    }
}

/// Submit `line` against the latest tail, then wait until the feed shows
/// the write so the next line is decided against the tail that holds it.
async fn submit_line<S: FeedStore + ?Sized>(
    composer: &Composer<S>,
    buffer: &mut CompositionBuffer,
    tail_rx: &mut watch::Receiver<Option<Post>>,
    line: &str,
) -> WallResult<SubmitOutcome> {
    buffer.set_text(line);
    let before = tail_rx.borrow().clone();
    let outcome = composer.submit(buffer, before.as_ref()).await?;
    let id = match &outcome {
        SubmitOutcome::Skipped => None,
        SubmitOutcome::Created(id) | SubmitOutcome::Extended(id) => Some(id.clone()),
    };
    let Some(id) = id else {
        return Ok(outcome);
    };

    let seen = tail_rx.wait_for(|tail| match tail {
        Some(tail) => tail.id == id && Some(tail) != before.as_ref(),
        None => false,
    });
    match tokio::time::timeout(OWN_WRITE_TIMEOUT, seen).await {
        Ok(Ok(_)) => {}
        Ok(Err(_)) => return Err(WallError::subscription_failure("feed task stopped").into()),
        Err(_) => warn!("Post {id} has not shown up on the feed yet"),
    }
    Ok(outcome)
}

async fn attach_image(buffer: &mut CompositionBuffer, path: &Path) -> anyhow::Result<()> {
    let bytes = tokio::fs::read(path).await?;
    let name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("image")
        .to_owned();
    if bytes.is_empty() {
        return Err(WallError::custom_error(format!("{} is empty", path.display())).into());
    }
    buffer.attach_image(bytes, name);
    Ok(())
}
