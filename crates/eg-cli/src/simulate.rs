//! Scripted popup sessions over the in-process bus.

use std::str::FromStr;
use std::sync::{Arc, Mutex};

use log::info;
use tokio::task::JoinHandle;

use eg_core::{markup, Document, MarkerStyle, TabId};
use eg_sync::{spawn_background, spawn_page, Background, LocalBus, MemoryBadges, PageContext, Popup, PopupState};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Step {
    /// Type text into the input box and press Enter
    Type(String),
    Next,
    Prev,
    Escape,
    /// Close and reopen the popup
    Reopen,
    /// Reload the page, which also closes the popup
    Reload,
}

impl FromStr for Step {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(text) = s.strip_prefix("type=") {
            return Ok(Self::Type(text.to_string()));
        }
        match s {
            "next" => Ok(Self::Next),
            "prev" => Ok(Self::Prev),
            "escape" => Ok(Self::Escape),
            "reopen" => Ok(Self::Reopen),
            "reload" => Ok(Self::Reload),
            other => Err(format!("Unknown step '{}'", other)),
        }
    }
}

pub fn run(path: &str, tab_id: TabId, steps: &[String], style: MarkerStyle) -> Result<(), String> {
    let source = crate::read_markup(path)?;
    let steps = steps
        .iter()
        .map(|s| s.parse())
        .collect::<Result<Vec<Step>, String>>()?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| format!("Failed to start tokio runtime: {}", e))?;

    let doc = runtime.block_on(replay(&source, tab_id, &steps, style))?;
    println!();
    println!("{}", markup::serialize(&doc));
    Ok(())
}

fn load_page(source: &str, tab_id: TabId, style: &MarkerStyle) -> PageContext<Document> {
    PageContext::with_style(tab_id, markup::parse(source), style.clone())
}

async fn open_popup(bus: &LocalBus, tab_id: TabId) -> Result<Popup<LocalBus>, String> {
    let mut popup = Popup::new(tab_id, bus.clone());
    popup.hydrate().await.map_err(|e| e.to_string())?;
    Ok(popup)
}

async fn replay(source: &str, tab_id: TabId, steps: &[Step], style: MarkerStyle) -> Result<Document, String> {
    let badges = Arc::new(Mutex::new(MemoryBadges::new()));
    let (background, background_task) = spawn_background(Background::new(badges.clone()));
    let (page, mut page_task) = spawn_page(load_page(source, tab_id, &style));
    let mut bus = LocalBus::new(background).with_page(tab_id, page);
    let mut popup = open_popup(&bus, tab_id).await?;

    for step in steps {
        info!("step {:?}", step);
        match step {
            Step::Type(text) => {
                let plan = popup.submit(text).await.map_err(|e| e.to_string())?;
                println!("type {:?} -> {}", text, plan.as_str());
            }
            Step::Next => popup.next().await.map_err(|e| e.to_string())?,
            Step::Prev => popup.prev().await.map_err(|e| e.to_string())?,
            Step::Escape => popup.escape().await.map_err(|e| e.to_string())?,
            Step::Reopen => {
                drop(popup);
                popup = open_popup(&bus, tab_id).await?;
            }
            Step::Reload => {
                drop(popup);
                let (page, task) = spawn_page(load_page(source, tab_id, &style));
                bus = bus.with_page(tab_id, page);
                join(page_task, "Page").await?;
                page_task = task;
                popup = open_popup(&bus, tab_id).await?;
            }
        }

        let badge = badges
            .lock()
            .map(|b| b.text(tab_id).to_string())
            .unwrap_or_default();
        println!("  {}  input={:?}  badge={:?}", describe(popup.state()), popup.input(), badge);
    }

    drop(popup);
    drop(bus);
    join(background_task, "Background").await?;
    let page = join(page_task, "Page").await?;
    Ok(page.tree().clone())
}

/// Wait for a context task to finish, reporting a panic inside it as an error.
async fn join<T>(task: JoinHandle<T>, context: &str) -> Result<T, String> {
    task.await.map_err(|e| format!("{} task failed: {}", context, e))
}

fn describe(state: &PopupState) -> String {
    match state {
        PopupState::Uninitialized => "uninitialized".to_string(),
        PopupState::Hydrated(_) => "idle".to_string(),
        PopupState::SearchActive(session) => format!(
            "active /{}/ {}/{}",
            session.search_string,
            session.match_index + 1,
            session.match_count
        ),
    }
}
