use std::collections::HashMap;
use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::collector::PageEndPolicy;
use crate::config::{selectors, Credentials, SearchConfig, LOGIN_URL};
use crate::driver::WindowHandle;
use crate::errors::AutomationError;
use crate::record::ProcessRecord;
use crate::selector::Selector;
use crate::session::{ExportPlan, Session, SessionState};

use super::mock::{MockDriver, MockElement};

const TIMEOUT: Duration = Duration::from_secs(2);

fn credentials() -> Credentials {
    Credentials {
        user: "someone".to_string(),
        password: "hunter2".to_string(),
        profile: None,
    }
}

/// Serve a fixed selector-to-element map; anything else is not found.
fn map_driver(map: HashMap<Selector, Arc<MockElement>>) -> Arc<MockDriver> {
    let driver = MockDriver::new();
    driver.on_find(move |sel| {
        map.get(sel)
            .map(|e| e.as_element())
            .ok_or_else(|| AutomationError::ElementNotFound(sel.to_string()))
    });
    driver
}

fn login_fields() -> HashMap<Selector, Arc<MockElement>> {
    let mut map = HashMap::new();
    map.insert(Selector::from(selectors::USERNAME_FIELD), MockElement::visible());
    map.insert(Selector::from(selectors::PASSWORD_FIELD), MockElement::visible());
    map.insert(Selector::from(selectors::LOGIN_BUTTON), MockElement::visible());
    map
}

#[tokio::test(start_paused = true)]
async fn login_fills_the_sso_form_and_waits_for_the_shell() {
    super::init_tracing();
    let map = login_fields();
    let user_field = map[&Selector::from(selectors::USERNAME_FIELD)].clone();
    let login_button = map[&Selector::from(selectors::LOGIN_BUTTON)].clone();
    let driver = map_driver(map);

    let dir = tempfile::tempdir().unwrap();
    let mut session = Session::start(driver.clone(), credentials(), TIMEOUT, dir.path())
        .await
        .unwrap();
    session.login().await.unwrap();

    assert_eq!(session.state(), SessionState::ProfileSelection);
    assert_eq!(*driver.visited.lock().unwrap(), vec![LOGIN_URL.to_string()]);
    assert_eq!(*user_field.typed.lock().unwrap(), vec!["someone".to_string()]);
    assert_eq!(login_button.native_clicks.load(Ordering::SeqCst), 1);
    // SSO frame first, then the portal shell.
    let frames = driver.entered_frames.lock().unwrap();
    assert_eq!(frames[0], Selector::from(selectors::SSO_FRAME));
    assert!(frames.contains(&Selector::from(selectors::NG_FRAME)));
}

#[tokio::test(start_paused = true)]
async fn missing_shell_after_login_is_an_authentication_error() {
    let driver = map_driver(login_fields());
    driver.on_enter_frame(|sel| {
        if *sel == Selector::from(selectors::NG_FRAME) {
            Err(AutomationError::ElementNotFound(sel.to_string()))
        } else {
            Ok(())
        }
    });

    let dir = tempfile::tempdir().unwrap();
    let mut session = Session::start(driver, credentials(), TIMEOUT, dir.path())
        .await
        .unwrap();
    let err = session.login().await.unwrap_err();
    assert!(matches!(err, AutomationError::Authentication(_)));
    assert_eq!(session.state(), SessionState::LoggingIn);
}

#[tokio::test(start_paused = true)]
async fn profile_selection_clicks_the_matching_menu_entry() {
    let mut map = HashMap::new();
    map.insert(
        Selector::from(selectors::PROFILE_DROPDOWN),
        MockElement::visible(),
    );
    let entry = MockElement::visible();
    map.insert(
        Selector::link_text_contains("Diretor de Secretaria"),
        entry.clone(),
    );
    let driver = map_driver(map);

    let mut creds = credentials();
    creds.profile = Some("Diretor de Secretaria".to_string());
    let dir = tempfile::tempdir().unwrap();
    let mut session = Session::start(driver.clone(), creds, TIMEOUT, dir.path())
        .await
        .unwrap();
    session.select_profile().await.unwrap();

    assert_eq!(session.state(), SessionState::Ready);
    assert_eq!(entry.native_clicks.load(Ordering::SeqCst), 1);
    // The dropdown is in the top-level document; no frame is involved.
    assert!(driver.entered_frames.lock().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn unknown_profile_is_reported_by_name() {
    let mut map = HashMap::new();
    map.insert(
        Selector::from(selectors::PROFILE_DROPDOWN),
        MockElement::visible(),
    );
    let driver = map_driver(map);

    let mut creds = credentials();
    creds.profile = Some("Cargo Inexistente".to_string());
    let dir = tempfile::tempdir().unwrap();
    let mut session = Session::start(driver, creds, TIMEOUT, dir.path()).await.unwrap();
    let err = session.select_profile().await.unwrap_err();
    match err {
        AutomationError::ProfileNotFound(name) => assert_eq!(name, "Cargo Inexistente"),
        other => panic!("expected ProfileNotFound, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn search_touches_only_the_provided_fields() {
    let mut map = HashMap::new();
    for sel in [
        selectors::SEARCH_MENU_ICON,
        selectors::COURT_UNIT_FIELD,
        selectors::CASE_CLASS_FIELD,
        selectors::PARTY_NAME_FIELD,
        selectors::OAB_NUMBER_FIELD,
        selectors::OAB_STATE_SELECT,
        selectors::SEARCH_SUBMIT,
    ] {
        map.insert(Selector::from(sel), MockElement::visible());
    }
    let court_unit = map[&Selector::from(selectors::COURT_UNIT_FIELD)].clone();
    let case_class = map[&Selector::from(selectors::CASE_CLASS_FIELD)].clone();
    let party_name = map[&Selector::from(selectors::PARTY_NAME_FIELD)].clone();
    let oab_number = map[&Selector::from(selectors::OAB_NUMBER_FIELD)].clone();
    let submit = map[&Selector::from(selectors::SEARCH_SUBMIT)].clone();
    let driver = map_driver(map);

    let dir = tempfile::tempdir().unwrap();
    let mut session = Session::start(driver, credentials(), TIMEOUT, dir.path())
        .await
        .unwrap();
    let search = SearchConfig::new(
        Some("Execução Fiscal".to_string()),
        None,
        None,
        None,
        None,
    )
    .unwrap();
    session.search(&search).await.unwrap();

    assert_eq!(*court_unit.typed.lock().unwrap(), vec!["0216".to_string()]);
    assert_eq!(
        *case_class.typed.lock().unwrap(),
        vec!["Execução Fiscal".to_string()]
    );
    assert!(party_name.typed.lock().unwrap().is_empty());
    assert!(oab_number.typed.lock().unwrap().is_empty());
    assert_eq!(submit.native_clicks.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn search_form_is_reached_through_the_nested_frame() {
    super::init_tracing();
    let driver = MockDriver::new();

    // The form frame only exists inside the shell frame, and the form
    // fields only resolve inside the form frame. A search that resets to
    // the root in between never finds either.
    let frames = Arc::new(Mutex::new(Vec::<Selector>::new()));
    {
        let frames = frames.clone();
        driver.on_reset(move || frames.lock().unwrap().clear());
    }
    {
        let frames = frames.clone();
        driver.on_enter_frame(move |sel| {
            let mut frames = frames.lock().unwrap();
            let ok = if *sel == Selector::from(selectors::NG_FRAME) {
                frames.is_empty()
            } else if *sel == Selector::from(selectors::SEARCH_FRAME) {
                frames.last() == Some(&Selector::from(selectors::NG_FRAME))
            } else {
                false
            };
            if !ok {
                return Err(AutomationError::ElementNotFound(sel.to_string()));
            }
            frames.push(sel.clone());
            Ok(())
        });
    }
    {
        let frames = frames.clone();
        driver.on_find(move |sel| {
            let frames = frames.lock().unwrap();
            let in_shell = frames.last() == Some(&Selector::from(selectors::NG_FRAME));
            let in_form = frames.last() == Some(&Selector::from(selectors::SEARCH_FRAME));
            let served = (*sel == Selector::from(selectors::SEARCH_MENU_ICON) && in_shell)
                || (in_form
                    && [selectors::COURT_UNIT_FIELD, selectors::SEARCH_SUBMIT]
                        .iter()
                        .any(|s| *sel == Selector::from(*s)));
            if served {
                Ok(MockElement::visible().as_element())
            } else {
                Err(AutomationError::ElementNotFound(sel.to_string()))
            }
        });
    }

    let dir = tempfile::tempdir().unwrap();
    let mut session = Session::start(driver.clone(), credentials(), TIMEOUT, dir.path())
        .await
        .unwrap();
    session.search(&SearchConfig::default()).await.unwrap();

    let entered = driver.entered_frames.lock().unwrap();
    assert_eq!(
        *entered,
        vec![
            Selector::from(selectors::NG_FRAME),
            Selector::from(selectors::SEARCH_FRAME),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn half_specified_oab_filter_is_rejected_up_front() {
    let err = SearchConfig::new(None, None, None, Some("12345".to_string()), None).unwrap_err();
    assert!(matches!(err, AutomationError::InvalidArgument(_)));
}

fn card_selector(index: usize) -> Selector {
    Selector::xpath(format!("(//processo-datalist-card)[{index}]//a/div/span[2]"))
}

#[tokio::test(start_paused = true)]
async fn party_details_walks_both_case_windows_for_every_record() {
    super::init_tracing();
    let driver = MockDriver::new();
    let windows = Arc::new(Mutex::new(vec![WindowHandle::from("w-1")]));
    let frames = Arc::new(Mutex::new(Vec::<Selector>::new()));
    let spawned = Arc::new(std::sync::atomic::AtomicUsize::new(0));

    {
        let windows = windows.clone();
        driver.on_window_handles(move || Ok(windows.lock().unwrap().clone()));
    }
    {
        // Windows are opened and closed stack-wise in this flow.
        let windows = windows.clone();
        driver.on_close_window(move || {
            let mut windows = windows.lock().unwrap();
            assert!(windows.len() > 1, "closed the original window");
            windows.pop();
        });
    }
    {
        let frames = frames.clone();
        driver.on_reset(move || frames.lock().unwrap().clear());
    }
    {
        // The card list frame exists in the original window only, the data
        // iframe in the party-data window only.
        let frames = frames.clone();
        let d = driver.clone();
        driver.on_enter_frame(move |sel| {
            let active = d.active.lock().unwrap().clone();
            let ok = if *sel == Selector::from(selectors::NG_FRAME) {
                active == WindowHandle::from("w-1")
            } else if *sel == Selector::from(selectors::PARTY_DATA_FRAME) {
                active.0.starts_with("data")
            } else {
                false
            };
            if !ok {
                return Err(AutomationError::ElementNotFound(sel.to_string()));
            }
            frames.lock().unwrap().push(sel.clone());
            Ok(())
        });
    }
    {
        let frames = frames.clone();
        let windows2 = windows.clone();
        let spawned = spawned.clone();
        let d = driver.clone();
        driver.on_find(move |sel| {
            let active = d.active.lock().unwrap().clone();
            let in_shell =
                frames.lock().unwrap().last() == Some(&Selector::from(selectors::NG_FRAME));
            if (*sel == card_selector(1) || *sel == card_selector(2))
                && active == WindowHandle::from("w-1")
                && in_shell
            {
                let windows = windows2.clone();
                let spawned = spawned.clone();
                return Ok(MockElement::visible()
                    .on_click(move || {
                        let n = spawned.fetch_add(1, Ordering::SeqCst) + 1;
                        windows
                            .lock()
                            .unwrap()
                            .push(WindowHandle::from(format!("case-{n}").as_str()));
                    })
                    .as_element());
            }
            if *sel == Selector::from(selectors::PROCESS_NAVBAR_MENU) && active.0.starts_with("case")
            {
                return Ok(MockElement::visible().as_element());
            }
            if *sel == Selector::from(selectors::PARTY_DATA_LINK) && active.0.starts_with("case") {
                let windows = windows2.clone();
                let spawned = spawned.clone();
                return Ok(MockElement::visible()
                    .on_click(move || {
                        let n = spawned.fetch_add(1, Ordering::SeqCst) + 1;
                        windows
                            .lock()
                            .unwrap()
                            .push(WindowHandle::from(format!("data-{n}").as_str()));
                    })
                    .as_element());
            }
            if active.0.starts_with("data") {
                if *sel == Selector::from(selectors::PARTY_CPF) {
                    return Ok(MockElement::with_text("123.456.789-00").as_element());
                }
                if *sel == Selector::from(selectors::PARTY_CIVIL_NAME) {
                    return Ok(MockElement::with_text("Fulana de Tal").as_element());
                }
            }
            Err(AutomationError::ElementNotFound(sel.to_string()))
        });
    }

    let records = vec![
        ProcessRecord::parse("0000001-02.2023.8.05.0001"),
        ProcessRecord::parse("0000002-03.2023.8.05.0001"),
    ];
    let dir = tempfile::tempdir().unwrap();
    let mut session = Session::start(driver.clone(), credentials(), TIMEOUT, dir.path())
        .await
        .unwrap();
    let details = session.collect_party_details(&records).await.unwrap();

    assert_eq!(details.len(), 2);
    for d in &details {
        assert_eq!(d.cpf.as_deref(), Some("123.456.789-00"));
        assert_eq!(d.civil_name.as_deref(), Some("Fulana de Tal"));
    }
    // Both detours closed both of their windows and came back.
    assert_eq!(driver.closed_windows.load(Ordering::SeqCst), 4);
    assert_eq!(*driver.active.lock().unwrap(), WindowHandle::from("w-1"));
    // The card list frame was re-entered for each record.
    let shell_entries = driver
        .entered_frames
        .lock()
        .unwrap()
        .iter()
        .filter(|s| **s == Selector::from(selectors::NG_FRAME))
        .count();
    assert_eq!(shell_entries, 2);
}

#[tokio::test(start_paused = true)]
async fn run_quits_the_browser_even_when_login_fails() {
    let driver = MockDriver::new();
    driver.on_enter_frame(|sel| Err(AutomationError::ElementNotFound(sel.to_string())));

    let dir = tempfile::tempdir().unwrap();
    let mut session = Session::start(driver.clone(), credentials(), TIMEOUT, dir.path())
        .await
        .unwrap();
    let search = SearchConfig::default();
    let err = session
        .run(
            &search,
            PageEndPolicy::CountBased { page_size: 20 },
            &ExportPlan {
                json_path: None,
                csv_path: None,
                with_details: false,
            },
        )
        .await
        .unwrap_err();

    assert!(matches!(err, AutomationError::Timeout(_)));
    assert_eq!(session.state(), SessionState::Failed);
    assert_eq!(driver.quit_calls.load(Ordering::SeqCst), 1);
    assert!(dir.path().join("session_exception.png").exists());
}

#[tokio::test(start_paused = true)]
async fn run_collects_and_exports_a_single_page() {
    let mut map = login_fields();
    for sel in [
        selectors::SEARCH_MENU_ICON,
        selectors::COURT_UNIT_FIELD,
        selectors::SEARCH_SUBMIT,
        selectors::RESULTS_TABLE_BODY,
    ] {
        map.insert(Selector::from(sel), MockElement::visible());
    }
    map.insert(
        Selector::from(selectors::RESULTS_LABEL),
        MockElement::with_text("2 resultados encontrados"),
    );
    let rows = [
        MockElement::with_attr("title", "0000001-02.2023.8.05.0001"),
        MockElement::with_attr("title", "0000002-03.2023.8.05.0001"),
    ];
    map.insert(
        Selector::from(selectors::RESULT_ROW_LINK),
        rows[0].clone(),
    );
    let driver = map_driver(map);
    let served_rows: Vec<Arc<MockElement>> = rows.to_vec();
    driver.on_find_all(move |sel| {
        if *sel == Selector::from(selectors::RESULT_ROW_LINK) {
            Ok(served_rows.iter().map(|e| e.as_element()).collect())
        } else {
            Ok(Vec::new())
        }
    });

    let dir = tempfile::tempdir().unwrap();
    let json_path = dir.path().join("docs").join("processos.json");
    let mut session = Session::start(driver.clone(), credentials(), TIMEOUT, dir.path())
        .await
        .unwrap();
    let records = session
        .run(
            &SearchConfig::default(),
            PageEndPolicy::TotalDerived { page_size: 20 },
            &ExportPlan {
                json_path: Some(json_path.clone()),
                csv_path: None,
                with_details: false,
            },
        )
        .await
        .unwrap();

    assert_eq!(session.state(), SessionState::Done);
    assert_eq!(records.len(), 2);
    assert_eq!(driver.quit_calls.load(Ordering::SeqCst), 1);

    let exported: Vec<String> =
        serde_json::from_str(&std::fs::read_to_string(&json_path).unwrap()).unwrap();
    assert_eq!(
        exported,
        vec![
            "0000001-02.2023.8.05.0001".to_string(),
            "0000002-03.2023.8.05.0001".to_string(),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn tag_search_opens_the_tagged_case_list() {
    super::init_tracing();
    let mut map = HashMap::new();
    for sel in [
        selectors::TAG_MENU,
        selectors::TAG_SEARCH_INPUT,
        selectors::TAG_SEARCH_BUTTON,
        selectors::TAG_RESULT_ENTRY,
    ] {
        map.insert(Selector::from(sel), MockElement::visible());
    }
    let input = map[&Selector::from(selectors::TAG_SEARCH_INPUT)].clone();
    let entry = map[&Selector::from(selectors::TAG_RESULT_ENTRY)].clone();
    let driver = map_driver(map);

    let dir = tempfile::tempdir().unwrap();
    let mut session = Session::start(driver.clone(), credentials(), TIMEOUT, dir.path())
        .await
        .unwrap();
    session.search_by_tag("urgente").await.unwrap();

    assert_eq!(session.state(), SessionState::Searching);
    assert_eq!(*input.typed.lock().unwrap(), vec!["urgente".to_string()]);
    assert_eq!(entry.native_clicks.load(Ordering::SeqCst), 1);
    assert_eq!(driver.closed_windows.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn stray_window_from_the_tag_search_is_closed() {
    super::init_tracing();
    let mut map = HashMap::new();
    for sel in [
        selectors::TAG_MENU,
        selectors::TAG_SEARCH_INPUT,
        selectors::TAG_RESULT_ENTRY,
    ] {
        map.insert(Selector::from(sel), MockElement::visible());
    }
    let windows = Arc::new(Mutex::new(vec![WindowHandle::from("w-1")]));
    let button = {
        let windows = windows.clone();
        MockElement::visible().on_click(move || {
            windows.lock().unwrap().push(WindowHandle::from("stray"));
        })
    };
    map.insert(Selector::from(selectors::TAG_SEARCH_BUTTON), button);
    let driver = map_driver(map);
    {
        let windows = windows.clone();
        driver.on_window_handles(move || Ok(windows.lock().unwrap().clone()));
    }
    {
        let windows = windows.clone();
        driver.on_close_window(move || {
            windows.lock().unwrap().pop();
        });
    }

    let dir = tempfile::tempdir().unwrap();
    let mut session = Session::start(driver.clone(), credentials(), TIMEOUT, dir.path())
        .await
        .unwrap();
    session.search_by_tag("urgente").await.unwrap();

    assert_eq!(driver.closed_windows.load(Ordering::SeqCst), 1);
    assert_eq!(*driver.active.lock().unwrap(), WindowHandle::from("w-1"));
    // Back inside the shell frame after the detour.
    let shell_entries = driver
        .entered_frames
        .lock()
        .unwrap()
        .iter()
        .filter(|s| **s == Selector::from(selectors::NG_FRAME))
        .count();
    assert_eq!(shell_entries, 2);
}

#[tokio::test(start_paused = true)]
async fn tagged_cards_are_read_and_deduplicated() {
    super::init_tracing();
    let driver = MockDriver::new();
    driver.on_find(|sel| {
        if *sel == Selector::from(selectors::TAG_CARD_NUMBER) {
            Ok(MockElement::visible().as_element())
        } else {
            Err(AutomationError::ElementNotFound(sel.to_string()))
        }
    });
    let cards = vec![
        MockElement::with_text("0000001-02.2023.8.05.0001"),
        MockElement::with_text("0000002-03.2023.8.05.0001"),
        MockElement::with_text("0000001-02.2023.8.05.0001"),
    ];
    driver.on_find_all(move |sel| {
        if *sel == Selector::from(selectors::TAG_CARD_NUMBER) {
            Ok(cards.iter().map(|c| c.as_element()).collect())
        } else {
            Ok(Vec::new())
        }
    });

    let dir = tempfile::tempdir().unwrap();
    let mut session = Session::start(driver, credentials(), TIMEOUT, dir.path())
        .await
        .unwrap();
    let records = session.collect_tagged_cards().await.unwrap();

    assert_eq!(
        records,
        vec![
            ProcessRecord::parse("0000001-02.2023.8.05.0001"),
            ProcessRecord::parse("0000002-03.2023.8.05.0001"),
        ]
    );
}
