//! Reader commands: parsing a typed line and running it against `AppState`

use noor_lib::catalog::{Collection, Topic};
use noor_lib::chapters::{chapter_name, search_chapters, ChapterEntry};
use noor_lib::config::default_config_path;
use noor_lib::daily::verse_of_the_day;
use noor_lib::fetcher::recitation_url;
use noor_lib::session::{commentary_or_fallback, user_message, LoadOutcome, SessionSnapshot};
use noor_lib::{AppState, ChapterNumber, FavoriteVerse, NoorError, TextGroup};
use std::fmt::Write;

pub const HELP: &str = "\
load N        open chapter N (1-114)
surah NAME    find chapters by name
next / prev   next or previous page
page P        go to page P
verse V       go to the page holding verse V
goto N V      open verse V of chapter N
next-surah    open the following chapter
prev-surah    open the preceding chapter
tafsir V      commentary for verse V of the open chapter
play V        recitation of verse V (stops the previous one)
stop          stop the current recitation
fav V         toggle verse V as a favorite
favs          list favorite verses and chapters
star          toggle the open chapter as a favorite
today         open the verse of the day
adhkar C      list collection C (morning|evening|general|duas)
find C LABEL  show the group of C with that label
search C Q    groups of C whose label or text contains Q
topic C T     groups of C on topic T (salah|wudu|sleep|prophet|prophets|distress|istighfar|quran|sunnah)
status        session, playback and cache state
save-config   write the current settings to the config file
unload        close the chapter and forget the session
quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Load(i64),
    Surah(String),
    NextPage,
    PrevPage,
    Page(usize),
    Verse(u32),
    Goto(i64, u32),
    NextChapter,
    PrevChapter,
    Tafsir(u32),
    Play(u32),
    Stop,
    Favorite(u32),
    Favorites,
    Star,
    Today,
    Adhkar(Collection),
    Find(Collection, String),
    Search(Collection, String),
    Topic(Collection, Topic),
    Status,
    SaveConfig,
    Unload,
    Help,
    Quit,
}

fn number<T: std::str::FromStr>(arg: Option<&&str>, usage: &str) -> Result<T, String> {
    arg.and_then(|s| s.parse().ok())
        .ok_or_else(|| format!("usage: {}", usage))
}

fn collection(arg: Option<&&str>, usage: &str) -> Result<Collection, String> {
    let name = arg.ok_or_else(|| format!("usage: {}", usage))?;
    name.parse().map_err(|e| format!("{}", e))
}

fn text(words: &[&str], usage: &str) -> Result<String, String> {
    if words.is_empty() {
        return Err(format!("usage: {}", usage));
    }
    Ok(words.join(" "))
}

/// `Ok(None)` for a blank line.
pub fn parse(line: &str) -> Result<Option<Command>, String> {
    let words: Vec<&str> = line.split_whitespace().collect();
    let Some(head) = words.first() else {
        return Ok(None);
    };
    let arg = words.get(1);
    let rest = words.get(2..).unwrap_or_default();

    let command = match *head {
        "load" | "l" => Command::Load(number(arg, "load N")?),
        "surah" | "s" => Command::Surah(text(&words[1..], "surah NAME")?),
        "next" | "n" => Command::NextPage,
        "prev" | "p" => Command::PrevPage,
        "page" => Command::Page(number(arg, "page P")?),
        "verse" | "v" => Command::Verse(number(arg, "verse V")?),
        "goto" | "g" => Command::Goto(number(arg, "goto N V")?, number(words.get(2), "goto N V")?),
        "next-surah" => Command::NextChapter,
        "prev-surah" => Command::PrevChapter,
        "tafsir" | "t" => Command::Tafsir(number(arg, "tafsir V")?),
        "play" => Command::Play(number(arg, "play V")?),
        "stop" => Command::Stop,
        "fav" => Command::Favorite(number(arg, "fav V")?),
        "favs" => Command::Favorites,
        "star" => Command::Star,
        "today" => Command::Today,
        "adhkar" => Command::Adhkar(collection(arg, "adhkar morning|evening|general|duas")?),
        "find" => Command::Find(collection(arg, "find C LABEL")?, text(rest, "find C LABEL")?),
        "search" => Command::Search(collection(arg, "search C Q")?, text(rest, "search C Q")?),
        "topic" => {
            let target = collection(arg, "topic C T")?;
            let topic = words.get(2).ok_or("usage: topic C T")?;
            Command::Topic(target, topic.parse().map_err(|e| format!("{}", e))?)
        }
        "status" => Command::Status,
        "save-config" => Command::SaveConfig,
        "unload" => Command::Unload,
        "help" | "?" => Command::Help,
        "quit" | "exit" | "q" => Command::Quit,
        other => return Err(format!("unknown command: {} (try help)", other)),
    };
    Ok(Some(command))
}

pub fn render_page(snapshot: &SessionSnapshot) -> String {
    let mut out = String::new();
    if let Some(error) = &snapshot.error {
        let _ = writeln!(out, "! {}", error);
    }
    let (Some(number), Some(name)) = (snapshot.chapter_number, &snapshot.chapter_name) else {
        if snapshot.error.is_none() {
            out.push_str("no chapter open\n");
        }
        return out;
    };
    let _ = writeln!(
        out,
        "{} ({}) [{}/{}]",
        name, number, snapshot.current_page, snapshot.total_pages
    );
    for verse in &snapshot.verses {
        let _ = writeln!(out, "  {:>3}. {}", verse.number_in_chapter, verse.text);
    }
    out
}

pub fn render_groups(groups: &[TextGroup]) -> String {
    let mut out = String::new();
    for group in groups {
        let _ = writeln!(out, "# {}", group.category);
        for item in &group.items {
            let _ = writeln!(out, "  - {} (x{})", item.text, item.repeat_count);
        }
    }
    if out.is_empty() {
        out.push_str("(empty)\n");
    }
    out
}

pub fn render_chapters(entries: &[ChapterEntry]) -> String {
    if entries.is_empty() {
        return "(no match)\n".to_string();
    }
    entries.iter().fold(String::new(), |mut out, entry| {
        let _ = writeln!(out, "  {:>3} {}", entry.id.get(), entry.name);
        out
    })
}

fn render_load(state: &AppState, outcome: Option<LoadOutcome>) -> String {
    match outcome {
        None => "nothing to open\n".to_string(),
        Some(LoadOutcome::Superseded) => String::new(),
        Some(LoadOutcome::Rejected(e)) => format!("! {}\n", user_message(&e)),
        Some(_) => render_page(&state.session.snapshot()),
    }
}

fn render_navigation_error(error: &NoorError) -> String {
    match error {
        NoorError::OutOfRange { what: "verse", .. } | NoorError::Other(_) => format!("! {}\n", error),
        _ => format!("! {}\n", user_message(error)),
    }
}

fn render_lookup(result: Result<Vec<TextGroup>, NoorError>) -> String {
    match result {
        Ok(groups) => render_groups(&groups),
        Err(e) => format!("! {}\n", e),
    }
}

/// Open the verse's page and print the verse itself.
async fn show_verse(state: &AppState, chapter: ChapterNumber, verse: u32) -> String {
    if let Err(e) = state.session.navigate_to_verse(chapter.get() as i64, verse).await {
        return render_navigation_error(&e);
    }
    let text = state
        .session
        .chapter()
        .and_then(|c| c.verses.iter().find(|v| v.number_in_chapter == verse).cloned())
        .map(|v| v.text)
        .unwrap_or_default();
    format!("{} {}:{}\n{}\n", chapter_name(chapter), chapter, verse, text)
}

/// Run one command and return what to print.
pub async fn execute(state: &AppState, command: Command) -> String {
    let session = &state.session;
    match command {
        Command::Load(n) => render_load(state, Some(session.load_chapter(n).await)),
        Command::Surah(query) => render_chapters(&search_chapters(&query)),
        Command::NextPage => {
            session.next_page();
            render_page(&session.snapshot())
        }
        Command::PrevPage => {
            session.prev_page();
            render_page(&session.snapshot())
        }
        Command::Page(p) => {
            session.change_page(p);
            render_page(&session.snapshot())
        }
        Command::Verse(v) => match session.go_to_verse(v) {
            Ok(_) => render_page(&session.snapshot()),
            Err(e) => format!("! {}\n", e),
        },
        Command::Goto(chapter, verse) => match session.navigate_to_verse(chapter, verse).await {
            Ok(_) => render_page(&session.snapshot()),
            Err(e) => render_navigation_error(&e),
        },
        Command::NextChapter => render_load(state, session.next_chapter().await),
        Command::PrevChapter => render_load(state, session.prev_chapter().await),
        Command::Tafsir(v) => {
            let Some(chapter) = session.chapter() else {
                return "no chapter open\n".to_string();
            };
            let verse_id = FavoriteVerse::verse_id(chapter.number, v);
            state.playback.open_menu(&verse_id);
            let text = commentary_or_fallback(
                session.load_commentary(chapter.number.get() as i64, v).await,
            );
            state.playback.close_menu(&verse_id);
            format!("{}:{}\n{}\n", chapter.number, v, text)
        }
        Command::Play(v) => {
            let Some(chapter) = session.chapter() else {
                return "no chapter open\n".to_string();
            };
            if !chapter.contains_verse(v) {
                return format!("! verse {} is not in this chapter\n", v);
            }
            state
                .playback
                .set_playing(Some(&FavoriteVerse::verse_id(chapter.number, v)));
            format!("playing {}:{} {}\n", chapter.number, v, recitation_url(chapter.number, v))
        }
        Command::Stop => match state.playback.playing_id() {
            Some(verse_id) => {
                state.playback.set_playing(None);
                format!("stopped {}\n", verse_id)
            }
            None => "nothing playing\n".to_string(),
        },
        Command::Favorite(v) => {
            let Some(chapter) = session.chapter() else {
                return "no chapter open\n".to_string();
            };
            let Some(verse) = chapter.verses.iter().find(|verse| verse.number_in_chapter == v) else {
                return format!("! verse {} is not in this chapter\n", v);
            };
            let added = state.favorites.toggle_verse(FavoriteVerse {
                id: FavoriteVerse::verse_id(chapter.number, v),
                verse_number: v,
                surah_name: chapter.name.clone(),
                text: verse.text.clone(),
                surah_id: Some(chapter.number.get()),
            });
            format!("{} {}:{}\n", if added { "+" } else { "-" }, chapter.number, v)
        }
        Command::Favorites => {
            let mut out = String::new();
            for verse in state.favorites.verses() {
                let _ = writeln!(
                    out,
                    "  {} {}:{} {}",
                    verse.surah_name,
                    verse.chapter(),
                    verse.verse_number,
                    verse.text
                );
            }
            let chapters: Vec<String> =
                state.favorites.chapters().iter().map(|c| c.to_string()).collect();
            let _ = writeln!(out, "chapters: {}", chapters.join(", "));
            out
        }
        Command::Star => match session.chapter() {
            Some(chapter) => {
                let added = state.favorites.toggle_chapter(chapter.number);
                format!("{} {}\n", if added { "+" } else { "-" }, chapter.number)
            }
            None => "no chapter open\n".to_string(),
        },
        Command::Today => match verse_of_the_day(chrono::Local::now().date_naive()) {
            Some((chapter, verse)) => show_verse(state, chapter, verse).await,
            None => "! no verse today\n".to_string(),
        },
        Command::Adhkar(collection) => render_lookup(state.catalog.collection(collection)),
        Command::Find(collection, label) => match state.catalog.find(collection, &label) {
            Ok(Some(group)) => render_groups(std::slice::from_ref(&group)),
            Ok(None) => format!("! no group named {}\n", label),
            Err(e) => format!("! {}\n", e),
        },
        Command::Search(collection, query) => render_lookup(state.catalog.search(collection, &query)),
        Command::Topic(collection, topic) => render_lookup(state.catalog.filter(collection, topic)),
        Command::Status => {
            let snapshot = session.snapshot();
            let (cached, pending) = state.coordinator.stats();
            format!(
                "{:?} chapter={} page={}/{} playing={} menu={} cached={} pending={}\n",
                snapshot.status,
                snapshot
                    .chapter_number
                    .map(|c| c.to_string())
                    .unwrap_or_else(|| "-".into()),
                snapshot.current_page,
                snapshot.total_pages,
                state.playback.playing_id().unwrap_or_else(|| "-".into()),
                state.playback.open_menu_id().unwrap_or_else(|| "-".into()),
                cached,
                pending
            )
        }
        Command::SaveConfig => match default_config_path() {
            Some(path) => match state.config.save_to(&path) {
                Ok(()) => format!("saved {}\n", path.display()),
                Err(e) => format!("! {:#}\n", e),
            },
            None => "! no config directory on this system\n".to_string(),
        },
        Command::Unload => {
            session.unload();
            state.playback.reset();
            "closed\n".to_string()
        }
        Command::Help => format!("{}\n", HELP),
        Command::Quit => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::future::BoxFuture;
    use futures_util::FutureExt;
    use noor_lib::session::SessionStatus;
    use noor_lib::{
        ChapterSource, CommentarySource, MemoryStore, NoorConfig, RawChapter, RawVerse, Verse,
    };
    use std::sync::Arc;

    struct StubSource;

    impl ChapterSource for StubSource {
        fn fetch_chapter(&self, number: ChapterNumber) -> BoxFuture<'_, Result<RawChapter, NoorError>> {
            async move {
                Ok(RawChapter {
                    number: number.get(),
                    name: chapter_name(number).to_string(),
                    verses: Some(
                        (1..=30)
                            .map(|v| RawVerse { number_in_chapter: v, text: Some(format!("آية {}", v)) })
                            .collect(),
                    ),
                })
            }
            .boxed()
        }
    }

    impl CommentarySource for StubSource {
        fn fetch_commentary(
            &self,
            _chapter: ChapterNumber,
            _verse: u32,
        ) -> BoxFuture<'_, Result<Option<String>, NoorError>> {
            async { Ok(None) }.boxed()
        }
    }

    fn state() -> AppState {
        let source = Arc::new(StubSource);
        AppState::with_sources(
            NoorConfig::default(),
            source.clone(),
            source,
            Arc::new(MemoryStore::new()),
        )
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(parse("load 18"), Ok(Some(Command::Load(18))));
        assert_eq!(parse("  next "), Ok(Some(Command::NextPage)));
        assert_eq!(parse("verse 13"), Ok(Some(Command::Verse(13))));
        assert_eq!(parse("adhkar masa"), Ok(Some(Command::Adhkar(Collection::Evening))));
        assert_eq!(parse(""), Ok(None));
        assert_eq!(parse("q"), Ok(Some(Command::Quit)));
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse("load").is_err());
        assert!(parse("load x").is_err());
        assert!(parse("page -1").is_err());
        assert!(parse("adhkar night").is_err());
        assert!(parse("fly").is_err());
        assert!(parse("goto 2").is_err());
        assert!(parse("find duas").is_err());
        assert!(parse("topic duas travel").is_err());
        assert!(parse("surah").is_err());
    }

    #[test]
    fn test_parse_lookup_commands() {
        assert_eq!(parse("goto 2 255"), Ok(Some(Command::Goto(2, 255))));
        assert_eq!(parse("surah آل عمران"), Ok(Some(Command::Surah("آل عمران".into()))));
        assert_eq!(
            parse("find duas دعاء  الفرج"),
            Ok(Some(Command::Find(Collection::Supplications, "دعاء الفرج".into())))
        );
        assert_eq!(
            parse("search general النوم"),
            Ok(Some(Command::Search(Collection::General, "النوم".into())))
        );
        assert_eq!(
            parse("topic duas prophets"),
            Ok(Some(Command::Topic(Collection::Supplications, Topic::Prophets)))
        );
        assert_eq!(parse("play 3"), Ok(Some(Command::Play(3))));
        assert_eq!(parse("save-config"), Ok(Some(Command::SaveConfig)));
    }

    #[tokio::test]
    async fn test_goto_opens_other_chapter_on_verse_page() {
        let state = state();
        execute(&state, Command::Load(1)).await;

        let out = execute(&state, Command::Goto(18, 25)).await;
        assert!(out.starts_with("الكهف (18) [3/3]"));
        assert!(out.contains(" 25. آية 25"));

        let out = execute(&state, Command::Goto(18, 31)).await;
        assert!(out.starts_with("! verse 31 is out of range"));
        let out = execute(&state, Command::Goto(200, 1)).await;
        assert_eq!(out, format!("! {}\n", noor_lib::session::MSG_OUT_OF_RANGE));
        assert_eq!(state.session.chapter().unwrap().number, ChapterNumber::new(18).unwrap());
    }

    #[tokio::test]
    async fn test_show_verse_reports_navigation_errors() {
        let state = state();
        let chapter = ChapterNumber::new(2).unwrap();

        assert_eq!(show_verse(&state, chapter, 7).await, "البقرة 2:7\nآية 7\n");
        assert_eq!(state.session.current_page(), 1);

        let out = show_verse(&state, chapter, 283).await;
        assert_eq!(out, "! verse 283 is out of range [1, 30]\n");
    }

    #[tokio::test]
    async fn test_play_stop_and_status() {
        let state = state();
        assert_eq!(execute(&state, Command::Play(1)).await, "no chapter open\n");
        execute(&state, Command::Load(2)).await;

        let out = execute(&state, Command::Play(5)).await;
        assert!(out.ends_with("/002005.mp3\n"));
        assert!(execute(&state, Command::Status).await.contains("playing=verse-2-5"));
        assert!(execute(&state, Command::Play(31)).await.starts_with("! verse 31"));

        assert_eq!(execute(&state, Command::Stop).await, "stopped verse-2-5\n");
        assert_eq!(execute(&state, Command::Stop).await, "nothing playing\n");

        execute(&state, Command::Play(6)).await;
        execute(&state, Command::Unload).await;
        assert!(execute(&state, Command::Status).await.contains("playing=- menu=-"));
    }

    #[tokio::test]
    async fn test_catalog_lookups() {
        let state = state();

        let found = execute(&state, Command::Find(Collection::Supplications, "دعاء الفرج".into())).await;
        assert!(found.starts_with("# دعاء الفرج\n"));
        let missing = execute(&state, Command::Find(Collection::Supplications, "دعاء مجهول".into())).await;
        assert_eq!(missing, "! no group named دعاء مجهول\n");

        let prophets = execute(&state, Command::Topic(Collection::Supplications, Topic::Prophets)).await;
        assert_eq!(prophets.lines().filter(|l| l.starts_with("# ")).count(), 9);

        let none = execute(&state, Command::Search(Collection::Supplications, "zzz".into())).await;
        assert_eq!(none, "(empty)\n");
    }

    #[tokio::test]
    async fn test_surah_search() {
        let state = state();
        assert_eq!(execute(&state, Command::Surah("الكهف".into())).await, "   18 الكهف\n");
        assert_eq!(execute(&state, Command::Surah("xyz".into())).await, "(no match)\n");
    }

    #[test]
    fn test_out_of_range_load_still_parses() {
        // range is enforced by the session, not the parser
        assert_eq!(parse("load 200"), Ok(Some(Command::Load(200))));
    }

    #[test]
    fn test_render_page() {
        let snapshot = SessionSnapshot {
            status: SessionStatus::Ready,
            chapter_number: ChapterNumber::new(1).ok(),
            chapter_name: Some("الفاتحة".into()),
            current_page: 1,
            total_pages: 1,
            verses: vec![Verse {
                sequence_index: 1,
                number_in_chapter: 1,
                text: "بِسْمِ اللَّهِ".into(),
            }],
            error: None,
        };
        let out = render_page(&snapshot);
        assert!(out.starts_with("الفاتحة (1) [1/1]"));
        assert!(out.contains("  1. بِسْمِ اللَّهِ"));
    }

    #[test]
    fn test_render_empty_session() {
        let snapshot = SessionSnapshot {
            status: SessionStatus::Error,
            chapter_number: None,
            chapter_name: None,
            current_page: 1,
            total_pages: 0,
            verses: vec![],
            error: Some("حدث خطأ أثناء تحميل السورة".into()),
        };
        assert_eq!(render_page(&snapshot), "! حدث خطأ أثناء تحميل السورة\n");
        assert_eq!(render_groups(&[]), "(empty)\n");
    }
}
