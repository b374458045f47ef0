use iced::Point;
use iced::keyboard::Key;

#[derive(Debug, Clone)]
pub enum Message {
    /// Pointer position relative to the canvas
    CursorMoved(Point),
    StrokeStarted,
    StrokeEnded,
    KeyPressed(Key),
}
