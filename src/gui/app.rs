use std::path::PathBuf;
use std::sync::Arc;

use iced::keyboard::{self, Key, key::Named};
use iced::widget::image::Handle;
use iced::widget::{Column, Image, column, container, mouse_area, text};
use iced::{Element, Event, Length, Subscription, Task, event, mouse, window};

use super::{AppState, Message, Phase};
use super::state::to_handle;
use crate::canvas::{CANVAS_HEIGHT, CANVAS_WIDTH, DrawingContext};
use crate::detection::DigitRecognizer;
use crate::detection::annotate::{AnnotationStyle, annotate};

pub struct DigitPadApp {
    state: AppState,
    recognizer: Arc<DigitRecognizer>,
    save: Option<PathBuf>,
}

impl DigitPadApp {
    pub fn new(recognizer: Arc<DigitRecognizer>, save: Option<PathBuf>) -> (Self, Task<Message>) {
        (
            Self {
                state: AppState::new(DrawingContext::new(CANVAS_WIDTH, CANVAS_HEIGHT)),
                recognizer,
                save,
            },
            Task::none(),
        )
    }

    pub fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::CursorMoved(point) => {
                if matches!(self.state.phase, Phase::Drawing)
                    && self.state.drawing.move_to(point.x as i32, point.y as i32)
                {
                    self.state.refresh_canvas();
                }
                Task::none()
            }
            Message::StrokeStarted => {
                if matches!(self.state.phase, Phase::Drawing) {
                    self.state.drawing.press_at_cursor();
                }
                Task::none()
            }
            Message::StrokeEnded => {
                self.state.drawing.release();
                Task::none()
            }
            Message::KeyPressed(key) => {
                let drawing = matches!(self.state.phase, Phase::Drawing);
                match key {
                    Key::Named(Named::Escape) if drawing => {
                        self.state.drawing.release();
                        self.state.phase = self.predict();
                        Task::none()
                    }
                    _ if drawing => Task::none(),
                    // Any key dismisses the results
                    _ => iced::exit(),
                }
            }
        }
    }

    fn predict(&self) -> Phase {
        let canvas = self.state.drawing.canvas();
        let predictions = match self.recognizer.recognize(canvas) {
            Ok(predictions) => predictions,
            Err(e) => {
                log::error!("Prediction failed: {:#}", e);
                return Phase::Failed(format!("Prediction failed: {:#}", e));
            }
        };

        let annotated = annotate(canvas, &predictions, &AnnotationStyle::default());
        if let Some(path) = &self.save {
            match annotated.save(path) {
                Ok(()) => log::info!("Annotated image written to {}", path.display()),
                Err(e) => log::error!("Failed to save {}: {}", path.display(), e),
            }
        }

        Phase::Results {
            annotated: to_handle(&annotated),
            labels: predictions.iter().map(|p| p.label()).collect(),
        }
    }

    pub fn view(&self) -> Element<'_, Message> {
        let content = match &self.state.phase {
            Phase::Drawing => {
                let pad = mouse_area(canvas_image(self.state.canvas_handle.clone()))
                    .on_press(Message::StrokeStarted)
                    .on_move(Message::CursorMoved);
                column![pad, text("Draw digits, then press Esc to predict")]
            }
            Phase::Results { annotated, labels } => {
                let lines = if labels.is_empty() {
                    Column::new().push(text("No digits found"))
                } else {
                    Column::with_children(labels.iter().map(|l| text(l.clone()).into()))
                };
                column![
                    text("Predictions").size(24),
                    canvas_image(annotated.clone()),
                    lines,
                    text("Press any key to exit"),
                ]
            }
            Phase::Failed(error) => column![text(error.clone()), text("Press any key to exit")],
        };

        container(content.spacing(8).padding(8))
            .width(Length::Fill)
            .height(Length::Fill)
            .into()
    }

    pub fn subscription(&self) -> Subscription<Message> {
        event::listen_with(handle_event)
    }
}

fn canvas_image(handle: Handle) -> Image<Handle> {
    iced::widget::image(handle)
        .width(Length::Fixed(CANVAS_WIDTH as f32))
        .height(Length::Fixed(CANVAS_HEIGHT as f32))
}

// Releases are taken from the window so a stroke also ends outside the canvas
fn handle_event(event: Event, _status: event::Status, _window: window::Id) -> Option<Message> {
    match event {
        Event::Keyboard(keyboard::Event::KeyPressed { key, .. }) => Some(Message::KeyPressed(key)),
        Event::Mouse(mouse::Event::ButtonReleased(mouse::Button::Left)) => Some(Message::StrokeEnded),
        _ => None,
    }
}

/// Open the drawing window; returns when the user dismisses the results
pub fn run(recognizer: DigitRecognizer, save: Option<PathBuf>) -> iced::Result {
    let recognizer = Arc::new(recognizer);

    iced::application(
        move || DigitPadApp::new(recognizer.clone(), save.clone()),
        DigitPadApp::update,
        DigitPadApp::view,
    )
    .title("Draw Digit")
    .subscription(DigitPadApp::subscription)
    .window_size((CANVAS_WIDTH as f32 + 16.0, CANVAS_HEIGHT as f32 + 200.0))
    .run()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::classifier::Classifier;
    use iced::Point;
    use rten_tensor::NdTensor;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Answering {
        digit: usize,
        calls: AtomicUsize,
    }

    impl Classifier for Answering {
        fn scores(&self, _input: &NdTensor<f32, 4>) -> anyhow::Result<Vec<f32>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut scores = vec![0.0; 10];
            scores[self.digit] = 1.0;
            Ok(scores)
        }
    }

    struct Failing;

    impl Classifier for Failing {
        fn scores(&self, _input: &NdTensor<f32, 4>) -> anyhow::Result<Vec<f32>> {
            anyhow::bail!("no model")
        }
    }

    fn app_with(classifier: Arc<dyn Classifier>) -> DigitPadApp {
        DigitPadApp::new(Arc::new(DigitRecognizer::new(classifier)), None).0
    }

    fn answering(digit: usize) -> (Arc<Answering>, DigitPadApp) {
        let classifier = Arc::new(Answering { digit, calls: AtomicUsize::new(0) });
        let app = app_with(classifier.clone());
        (classifier, app)
    }

    fn stroke(app: &mut DigitPadApp, from: (f32, f32), to: (f32, f32)) {
        let _ = app.update(Message::CursorMoved(Point::new(from.0, from.1)));
        let _ = app.update(Message::StrokeStarted);
        let _ = app.update(Message::CursorMoved(Point::new(to.0, to.1)));
        let _ = app.update(Message::StrokeEnded);
    }

    fn ink(app: &DigitPadApp) -> usize {
        app.state.drawing.canvas().pixels().filter(|p| p[0] > 0).count()
    }

    fn escape() -> Message {
        Message::KeyPressed(Key::Named(Named::Escape))
    }

    #[test]
    fn test_pointer_messages_draw_strokes() {
        let (_, mut app) = answering(0);

        stroke(&mut app, (100.0, 100.0), (150.0, 100.0));

        assert_eq!(app.state.drawing.canvas().get_pixel(125, 100)[0], 255);
        assert!(!app.state.drawing.is_drawing());

        // Released: moving no longer draws
        let before = ink(&app);
        let _ = app.update(Message::CursorMoved(Point::new(150.0, 300.0)));
        assert_eq!(ink(&app), before);
    }

    #[test]
    fn test_window_release_ends_stroke() {
        let (_, mut app) = answering(0);
        let _ = app.update(Message::CursorMoved(Point::new(10.0, 10.0)));
        let _ = app.update(Message::StrokeStarted);
        assert!(app.state.drawing.is_drawing());

        let _ = app.update(Message::StrokeEnded);

        assert!(!app.state.drawing.is_drawing());
    }

    #[test]
    fn test_other_keys_keep_drawing() {
        let (classifier, mut app) = answering(0);

        let _ = app.update(Message::KeyPressed(Key::Character("a".into())));
        let _ = app.update(Message::KeyPressed(Key::Named(Named::Enter)));

        assert!(matches!(app.state.phase, Phase::Drawing));
        assert_eq!(classifier.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_escape_predicts_and_shows_results() {
        let (classifier, mut app) = answering(4);
        for y in (200..260).step_by(2) {
            stroke(&mut app, (200.0, y as f32), (260.0, y as f32));
        }

        let _ = app.update(escape());

        match &app.state.phase {
            Phase::Results { labels, .. } => assert_eq!(labels, &vec!["Prediction: 4".to_string()]),
            other => panic!("expected results, got {:?}", other),
        }
        assert_eq!(classifier.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_escape_on_blank_canvas_shows_no_labels() {
        let (classifier, mut app) = answering(4);

        let _ = app.update(escape());

        assert!(matches!(&app.state.phase, Phase::Results { labels, .. } if labels.is_empty()));
        assert_eq!(classifier.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_escape_mid_stroke_releases_it() {
        let (_, mut app) = answering(1);
        let _ = app.update(Message::CursorMoved(Point::new(50.0, 50.0)));
        let _ = app.update(Message::StrokeStarted);
        let _ = app.update(Message::CursorMoved(Point::new(90.0, 50.0)));

        let _ = app.update(escape());

        assert!(!app.state.drawing.is_drawing());
        assert!(matches!(app.state.phase, Phase::Results { .. }));
    }

    #[test]
    fn test_no_drawing_after_results() {
        let (_, mut app) = answering(2);
        stroke(&mut app, (100.0, 100.0), (150.0, 100.0));
        let _ = app.update(escape());
        let before = ink(&app);

        stroke(&mut app, (300.0, 300.0), (400.0, 300.0));

        assert_eq!(ink(&app), before);
        assert!(!app.state.drawing.is_drawing());
        assert!(matches!(app.state.phase, Phase::Results { .. }));
    }

    #[test]
    fn test_failed_prediction_is_shown() {
        let mut app = app_with(Arc::new(Failing));
        stroke(&mut app, (100.0, 100.0), (150.0, 100.0));

        let _ = app.update(escape());

        match &app.state.phase {
            Phase::Failed(message) => assert!(message.contains("no model")),
            other => panic!("expected failure, got {:?}", other),
        }
    }
}
