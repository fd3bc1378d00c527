use crate::config::SpeechParams;

/// Events emitted by a speech-recognition session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoiceEvent {
    Started,
    Transcript(String),
    Error(String),
    Ended,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceState {
    /// No recognition engine available; capture stays disabled.
    Unsupported,
    Idle,
    Listening,
}

/// Speech-to-text engine seam. Engines run their own capture session and
/// report back through `VoiceEvent`s fed into the app event channel.
pub trait SpeechRecognizer {
    fn start(&mut self, lang: &str) -> anyhow::Result<()>;
    fn stop(&mut self);
}

/// Text-to-speech engine seam.
pub trait SpeechSynthesizer {
    fn speak(&mut self, text: &str, params: &SpeechParams);
    fn cancel(&mut self);
}

/// Probe for a platform recognition engine. The client ships none of its
/// own; an engine plugs in through the `SpeechRecognizer` trait.
pub fn detect_recognizer() -> Option<Box<dyn SpeechRecognizer>> {
    None
}

pub fn detect_synthesizer() -> Option<Box<dyn SpeechSynthesizer>> {
    None
}

/// Owns the capture state machine (Idle -> Listening -> Idle) and the
/// synthesis queue policy (cancel before speak, at most one utterance).
pub struct VoiceController {
    recognizer: Option<Box<dyn SpeechRecognizer>>,
    synthesizer: Option<Box<dyn SpeechSynthesizer>>,
    state: VoiceState,
    lang: String,
    params: SpeechParams,
}

impl VoiceController {
    pub fn new(
        recognizer: Option<Box<dyn SpeechRecognizer>>,
        synthesizer: Option<Box<dyn SpeechSynthesizer>>,
        lang: String,
        params: SpeechParams,
    ) -> Self {
        let state = if recognizer.is_some() {
            VoiceState::Idle
        } else {
            VoiceState::Unsupported
        };
        Self {
            recognizer,
            synthesizer,
            state,
            lang,
            params,
        }
    }

    pub fn state(&self) -> VoiceState {
        self.state
    }

    pub fn supported(&self) -> bool {
        self.state != VoiceState::Unsupported
    }

    /// Begin a capture session. A second start while listening is a no-op;
    /// only one session may be active.
    pub fn start_capture(&mut self) {
        if self.state != VoiceState::Idle {
            return;
        }
        if let Some(recognizer) = &mut self.recognizer {
            if recognizer.start(&self.lang).is_ok() {
                self.state = VoiceState::Listening;
            }
        }
    }

    pub fn stop_capture(&mut self) {
        if self.state != VoiceState::Listening {
            return;
        }
        if let Some(recognizer) = &mut self.recognizer {
            recognizer.stop();
        }
    }

    /// Start when idle, stop when listening.
    pub fn toggle_capture(&mut self) {
        match self.state {
            VoiceState::Idle => self.start_capture(),
            VoiceState::Listening => self.stop_capture(),
            VoiceState::Unsupported => {}
        }
    }

    /// Apply a recognition event. Returns the recognized utterance when one
    /// arrives so the caller can submit it as a chat message. End and error
    /// reset the capture state unconditionally.
    pub fn on_event(&mut self, event: VoiceEvent) -> Option<String> {
        match event {
            VoiceEvent::Started => {
                if self.state == VoiceState::Idle {
                    self.state = VoiceState::Listening;
                }
                None
            }
            VoiceEvent::Transcript(text) => Some(text),
            VoiceEvent::Error(_) | VoiceEvent::Ended => {
                if self.state == VoiceState::Listening {
                    self.state = VoiceState::Idle;
                }
                None
            }
        }
    }

    /// Speak a reply. Any in-flight utterance is cancelled first so at most
    /// one is ever audible (last-write-wins).
    pub fn speak(&mut self, text: &str) {
        if let Some(synthesizer) = &mut self.synthesizer {
            synthesizer.cancel();
            synthesizer.speak(text, &self.params);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    struct FakeRecognizer {
        calls: Rc<RefCell<Vec<String>>>,
    }

    impl SpeechRecognizer for FakeRecognizer {
        fn start(&mut self, lang: &str) -> anyhow::Result<()> {
            self.calls.borrow_mut().push(format!("start:{}", lang));
            Ok(())
        }

        fn stop(&mut self) {
            self.calls.borrow_mut().push("stop".to_string());
        }
    }

    struct FakeSynthesizer {
        calls: Rc<RefCell<Vec<String>>>,
    }

    impl SpeechSynthesizer for FakeSynthesizer {
        fn speak(&mut self, text: &str, _params: &SpeechParams) {
            self.calls.borrow_mut().push(format!("speak:{}", text));
        }

        fn cancel(&mut self) {
            self.calls.borrow_mut().push("cancel".to_string());
        }
    }

    fn controller_with_fakes(
        rec_calls: Rc<RefCell<Vec<String>>>,
        synth_calls: Rc<RefCell<Vec<String>>>,
    ) -> VoiceController {
        VoiceController::new(
            Some(Box::new(FakeRecognizer { calls: rec_calls })),
            Some(Box::new(FakeSynthesizer { calls: synth_calls })),
            "en-US".to_string(),
            SpeechParams::default(),
        )
    }

    #[test]
    fn test_no_recognizer_means_unsupported() {
        let mut controller =
            VoiceController::new(None, None, "en-US".to_string(), SpeechParams::default());
        assert_eq!(controller.state(), VoiceState::Unsupported);
        controller.start_capture();
        controller.toggle_capture();
        assert_eq!(controller.state(), VoiceState::Unsupported);
    }

    #[test]
    fn test_second_start_while_listening_is_noop() {
        let rec = Rc::new(RefCell::new(Vec::new()));
        let mut controller = controller_with_fakes(rec.clone(), Rc::new(RefCell::new(Vec::new())));

        controller.start_capture();
        assert_eq!(controller.state(), VoiceState::Listening);
        controller.start_capture();
        assert_eq!(rec.borrow().len(), 1);
    }

    #[test]
    fn test_toggle_stops_active_session() {
        let rec = Rc::new(RefCell::new(Vec::new()));
        let mut controller = controller_with_fakes(rec.clone(), Rc::new(RefCell::new(Vec::new())));

        controller.toggle_capture();
        controller.toggle_capture();
        assert_eq!(*rec.borrow(), vec!["start:en-US".to_string(), "stop".to_string()]);
    }

    #[test]
    fn test_transcript_then_end_resets_to_idle() {
        let mut controller = controller_with_fakes(
            Rc::new(RefCell::new(Vec::new())),
            Rc::new(RefCell::new(Vec::new())),
        );

        controller.start_capture();
        let utterance = controller.on_event(VoiceEvent::Transcript("hello nova".to_string()));
        assert_eq!(utterance.as_deref(), Some("hello nova"));
        assert_eq!(controller.state(), VoiceState::Listening);

        controller.on_event(VoiceEvent::Ended);
        assert_eq!(controller.state(), VoiceState::Idle);
    }

    #[test]
    fn test_error_resets_state_unconditionally() {
        let mut controller = controller_with_fakes(
            Rc::new(RefCell::new(Vec::new())),
            Rc::new(RefCell::new(Vec::new())),
        );

        controller.start_capture();
        controller.on_event(VoiceEvent::Error("no-speech".to_string()));
        assert_eq!(controller.state(), VoiceState::Idle);
    }

    #[test]
    fn test_speak_cancels_inflight_utterance_first() {
        let synth = Rc::new(RefCell::new(Vec::new()));
        let mut controller =
            controller_with_fakes(Rc::new(RefCell::new(Vec::new())), synth.clone());

        controller.speak("first");
        controller.speak("second");
        assert_eq!(
            *synth.borrow(),
            vec![
                "cancel".to_string(),
                "speak:first".to_string(),
                "cancel".to_string(),
                "speak:second".to_string(),
            ]
        );
    }
}
