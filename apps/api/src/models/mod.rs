pub mod diary;
pub mod weather;

pub use diary::DiaryEntry;
pub use weather::{Weather, WeatherRecord};
