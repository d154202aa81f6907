//! Prints feed updates to the terminal, typing new characters out at
//! their reveal delays.

use async_trait::async_trait;
use std::io::Write;
use tokio::time::{sleep_until, Instant};
use wordfarm_core::{
    feed::FeedDiff,
    render::{RenderedPost, Unit},
    session::FeedUpdate,
};

/// Where the wall shows its updates.
#[async_trait]
pub trait Printer: Send {
    /// Show the feed as it stood when the wall was opened, nothing animated.
    fn print_feed(&mut self, update: &FeedUpdate) -> std::io::Result<()>;

    /// Show one update, revealing its new characters on schedule.
    async fn print_update(&mut self, update: &FeedUpdate) -> std::io::Result<()>;
}

/// Prints to stdout.
#[derive(Debug, Default)]
pub struct Terminal;

#[async_trait]
impl Printer for Terminal {
    fn print_feed(&mut self, update: &FeedUpdate) -> std::io::Result<()> {
        let mut stdout = std::io::stdout();
        for post in &update.posts {
            writeln!(stdout, "[{}]", post.id)?;
            write!(stdout, "{post}")?;
        }
        stdout.flush()
    }

    async fn print_update(&mut self, update: &FeedUpdate) -> std::io::Result<()> {
        let mut stdout = std::io::stdout();
        match &update.diff {
            FeedDiff::NewTail { .. } => {
                if let Some(tail) = update.tail() {
                    write!(stdout, "\n[{}]\n", tail.id)?;
                    type_out(&mut stdout, tail, 0).await?;
                    if let Some(url) = &tail.image_url {
                        write!(stdout, "\n[image] {url}")?;
                    }
                }
            }
            FeedDiff::TailGrew { from_offset, .. } => {
                if let Some(tail) = update.tail() {
                    type_out(&mut stdout, tail, *from_offset).await?;
                }
            }
            FeedDiff::NoChange => writeln!(stdout, "\n(the wall is empty)")?,
            FeedDiff::NoAnimatableChange => {}
        }
        stdout.flush()
    }
}

/// Type the units of `post` that are new to `out`, keeping to the schedule.
/// A line break is typed when its own index is at or past `from_offset`.
pub async fn type_out<W: Write + Send>(
    out: &mut W,
    post: &RenderedPost,
    from_offset: usize,
) -> std::io::Result<()> {
    let start = Instant::now();
    let mut index = 0usize;
    for (n, line) in post.lines.iter().enumerate() {
        if n > 0 {
            if index >= from_offset {
                writeln!(out)?;
            }
            index += 1;
        }
        for unit in &line.units {
            let reveal = unit.reveal();
            if reveal.is_new() {
                sleep_until(start + reveal.delay()).await;
                match unit {
                    Unit::Char { ch, .. } => write!(out, "{ch}")?,
                    Unit::Link { text, .. } => write!(out, "\x1b[4m{text}\x1b[0m")?,
                }
                out.flush()?;
            }
        }
        index += line.units.iter().map(Unit::span).sum::<usize>();
    }
    Ok(())
}
