//! The tray event loop.
//!
//! [`run`] takes over the calling thread: it creates the native handles, reports
//! [`TrayEvent::Ready`], then blocks on the backend's native wait and processes
//! queued tasks and native input until a quit request or a close from the platform.

use crate::config::TrayConfig;
use crate::error::TrayError;
use crate::menu::MenuItemTable;
use crate::platform::Backend;
use crate::tray::dispatcher::{InputSender, LoopMessage, Mailbox, NativeInput};
use crate::tray::event::TrayEvent;
use crate::tray::registry;
use std::ops::ControlFlow;
use tracing::{debug, warn};

/// Lifecycle of the event loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopState {
    Uninitialized,
    Ready,
    Running,
    Terminating,
}

/// Runs the event loop with backend `B` on the calling thread.
///
/// Returns once `quit` was processed or the platform closed the tray. A failure to
/// create the native handles is returned immediately without emitting any event.
pub fn run<B, F>(config: &TrayConfig, mailbox: Mailbox, on_event: F) -> Result<(), TrayError>
where
    B: Backend,
    F: FnMut(TrayEvent),
{
    run_with(
        mailbox,
        |inputs| registry::initialize::<B>(config, inputs),
        on_event,
    )
}

/// Like [`run`], with an explicit backend constructor.
pub fn run_with<B, I, F>(mailbox: Mailbox, init: I, mut on_event: F) -> Result<(), TrayError>
where
    B: Backend,
    I: FnOnce(InputSender) -> Result<B, TrayError>,
    F: FnMut(TrayEvent),
{
    let mut event_loop = EventLoop {
        backend: init(mailbox.input_sender())?,
        table: MenuItemTable::new(),
        state: LoopState::Uninitialized,
    };
    if let Some(waker) = event_loop.backend.waker() {
        mailbox.install_waker(waker);
    }

    event_loop.transition(LoopState::Ready);
    on_event(TrayEvent::Ready);
    event_loop.transition(LoopState::Running);

    while let Some(message) = event_loop.backend.next_message(&mailbox) {
        let flow = match message {
            LoopMessage::Task(task) => task.run(&mut event_loop.backend, &mut event_loop.table),
            LoopMessage::Input(input) => event_loop.handle_input(input, &mut on_event),
        };
        if flow.is_break() {
            break;
        }
    }

    event_loop.transition(LoopState::Terminating);
    event_loop.backend.teardown();
    Ok(())
}

struct EventLoop<B: Backend> {
    backend: B,
    table: MenuItemTable<B::Item>,
    state: LoopState,
}

impl<B: Backend> EventLoop<B> {
    fn transition(&mut self, next: LoopState) {
        debug!(from = ?self.state, to = ?next, "event loop state");
        self.state = next;
    }

    fn handle_input(
        &self,
        input: NativeInput,
        on_event: &mut impl FnMut(TrayEvent),
    ) -> ControlFlow<()> {
        match input {
            NativeInput::ItemSelected(menu_id) => {
                if self.table.contains(menu_id) {
                    on_event(TrayEvent::ItemSelected(menu_id));
                } else {
                    debug!(menu_id, "selection for untracked menu id ignored");
                }
            }
            NativeInput::ItemAtPosition(position) => {
                match self.table.lookup_id_by_position(position) {
                    Some(menu_id) => on_event(TrayEvent::ItemSelected(menu_id)),
                    None => warn!(position, "selected menu position is not tracked"),
                }
            }
            NativeInput::Close => return ControlFlow::Break(()),
        }
        ControlFlow::Continue(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::menu::MenuItem;
    use crate::testing::{Call, CallLog, RecordingBackend};
    use crate::tray::dispatcher::channel;
    use crate::tray::task::IconSource;
    use std::sync::mpsc;
    use std::thread;

    fn collect(events: &mut Vec<TrayEvent>) -> impl FnMut(TrayEvent) + '_ {
        move |event| events.push(event)
    }

    fn recording(log: &CallLog) -> impl FnOnce(InputSender) -> Result<RecordingBackend, TrayError> {
        let log = log.clone();
        move |inputs| Ok(RecordingBackend::with_log(log, inputs))
    }

    #[test]
    fn upserts_queued_before_start_collapse_to_one_item() {
        let (proxy, mailbox) = channel();
        let log = CallLog::default();
        proxy.add_or_update_menu_item(1, "Open", "", false, false);
        proxy.add_or_update_menu_item(1, "Open", "", true, false);
        proxy.quit();

        let mut events = Vec::new();
        run_with(mailbox, recording(&log), collect(&mut events)).unwrap();

        assert_eq!(events, vec![TrayEvent::Ready]);
        assert_eq!(log.count(|c| matches!(c, Call::Append { menu_id: 1, .. })), 1);
        assert_eq!(log.last_state(1), Some(("Open".to_string(), true, false)));
    }

    #[test]
    fn selection_of_tracked_item_is_reported_once() {
        let (proxy, mailbox) = channel();
        let inputs = mailbox.input_sender();
        let log = CallLog::default();
        proxy.add_or_update_menu_item(2, "Quit", "", false, false);
        inputs.send(NativeInput::ItemSelected(2));
        proxy.quit();

        let mut events = Vec::new();
        run_with(mailbox, recording(&log), collect(&mut events)).unwrap();

        assert_eq!(events, vec![TrayEvent::Ready, TrayEvent::ItemSelected(2)]);
    }

    #[test]
    fn untracked_ids_and_positions_are_never_reported() {
        let (proxy, mailbox) = channel();
        let inputs = mailbox.input_sender();
        let log = CallLog::default();
        inputs.send(NativeInput::ItemSelected(5));
        proxy.add_or_update_menu_item(1, "One", "", false, false);
        inputs.send(NativeInput::ItemSelected(99));
        inputs.send(NativeInput::ItemAtPosition(3));
        proxy.quit();

        let mut events = Vec::new();
        run_with(mailbox, recording(&log), collect(&mut events)).unwrap();

        assert_eq!(events, vec![TrayEvent::Ready]);
    }

    #[test]
    fn positions_resolve_to_menu_ids() {
        let (proxy, mailbox) = channel();
        let inputs = mailbox.input_sender();
        let log = CallLog::default();
        proxy.add_or_update_menu_item(10, "Ten", "", false, false);
        proxy.add_or_update_menu_item(20, "Twenty", "", false, false);
        proxy.add_or_update_menu_item(10, "Ten again", "", false, true);
        inputs.send(NativeInput::ItemAtPosition(1));
        inputs.send(NativeInput::ItemAtPosition(0));
        proxy.quit();

        let mut events = Vec::new();
        run_with(mailbox, recording(&log), collect(&mut events)).unwrap();

        assert_eq!(
            events,
            vec![
                TrayEvent::Ready,
                TrayEvent::ItemSelected(20),
                TrayEvent::ItemSelected(10),
            ]
        );
    }

    #[test]
    fn init_failure_returns_error_without_events() {
        let (proxy, mailbox) = channel();
        proxy.set_title("never applied");

        let mut events = Vec::new();
        let result = run_with(
            mailbox,
            |_inputs| -> Result<RecordingBackend, TrayError> { Err(TrayError::Unsupported) },
            collect(&mut events),
        );

        assert!(matches!(result, Err(TrayError::Unsupported)));
        assert!(events.is_empty());
    }

    #[test]
    fn tasks_from_many_threads_run_in_per_thread_order_on_the_loop_thread() {
        const PRODUCERS: usize = 4;
        const PER_PRODUCER: usize = 50;

        let (proxy, mailbox) = channel();
        let log = CallLog::default();

        let producers: Vec<_> = (0..PRODUCERS)
            .map(|p| {
                let proxy = proxy.clone();
                thread::spawn(move || {
                    for seq in 0..PER_PRODUCER {
                        proxy.set_title(format!("{p}:{seq}"));
                    }
                    thread::current().id()
                })
            })
            .collect();
        let producer_threads: Vec<_> = producers.into_iter().map(|h| h.join().unwrap()).collect();
        proxy.quit();

        let loop_log = log.clone();
        let loop_thread = thread::spawn(move || {
            run_with(mailbox, recording(&loop_log), |_| {}).unwrap();
            thread::current().id()
        });
        let loop_thread_id = loop_thread.join().unwrap();

        let titles: Vec<String> = log
            .calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Title(t) => Some(t),
                _ => None,
            })
            .collect();
        assert_eq!(titles.len(), PRODUCERS * PER_PRODUCER);

        for p in 0..PRODUCERS {
            let seqs: Vec<usize> = titles
                .iter()
                .filter_map(|t| t.split_once(':'))
                .filter(|(producer, _)| producer.parse::<usize>().unwrap() == p)
                .map(|(_, seq)| seq.parse().unwrap())
                .collect();
            assert_eq!(seqs, (0..PER_PRODUCER).collect::<Vec<_>>());
        }

        let threads = log.threads();
        assert!(threads.iter().all(|t| *t == loop_thread_id));
        assert!(producer_threads.iter().all(|t| *t != loop_thread_id));
    }

    #[test]
    fn quit_wakes_a_blocked_loop_and_tears_down() {
        let (proxy, mailbox) = channel();
        let log = CallLog::default();
        let (event_tx, event_rx) = mpsc::channel();

        let loop_log = log.clone();
        let handle = thread::spawn(move || {
            run_with(mailbox, recording(&loop_log), move |event| {
                let _ = event_tx.send(event);
            })
        });

        assert_eq!(event_rx.recv().unwrap(), TrayEvent::Ready);
        proxy.set_tooltip("hello");
        proxy.quit();

        assert!(handle.join().unwrap().is_ok());
        assert_eq!(
            log.calls(),
            vec![Call::Tooltip("hello".to_string()), Call::Teardown]
        );
        assert_eq!(log.wakes(), 2);
    }

    #[test]
    fn tasks_after_quit_are_not_run() {
        let (proxy, mailbox) = channel();
        let log = CallLog::default();
        proxy.quit();
        proxy.set_icon(IconSource::Path("/tmp/late.png".into()));

        run_with(mailbox, recording(&log), |_| {}).unwrap();

        assert_eq!(log.calls(), vec![Call::Teardown]);
    }

    #[test]
    fn failing_native_call_does_not_stop_the_loop() {
        let (proxy, mailbox) = channel();
        let log = CallLog::default();
        proxy.add_or_update_menu_item(1, "broken", "", false, false);
        proxy.add_or_update_menu_item(2, "fine", "", false, false);
        proxy.quit();

        let mut events = Vec::new();
        let init_log = log.clone();
        run_with(
            mailbox,
            move |inputs| {
                let mut backend = RecordingBackend::with_log(init_log, inputs);
                backend.fail_next_append();
                Ok(backend)
            },
            collect(&mut events),
        )
        .unwrap();

        assert_eq!(log.count(|c| matches!(c, Call::Append { menu_id: 1, .. })), 0);
        assert_eq!(log.count(|c| matches!(c, Call::Append { menu_id: 2, .. })), 1);
        assert_eq!(log.count(|c| matches!(c, Call::Teardown)), 1);
    }

    #[test]
    fn native_close_terminates_the_loop() {
        let (proxy, mailbox) = channel();
        let log = CallLog::default();
        mailbox.input_sender().send(NativeInput::Close);
        proxy.upsert_menu_item(MenuItem::new(1, "late"));

        run_with(mailbox, recording(&log), |_| {}).unwrap();

        assert_eq!(log.calls(), vec![Call::Teardown]);
    }
}
