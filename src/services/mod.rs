pub mod gpa_engine;
pub mod html_extractor;
pub mod page_classifier;
pub mod password_cipher;
pub mod record_mapper;

pub use gpa_engine::{GpaEngine, GpaRules};
pub use html_extractor::{NoticeExtraction, NoticeStrategy};
pub use page_classifier::PortalPage;
