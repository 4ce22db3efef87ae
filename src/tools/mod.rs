mod fcpxml_parser;
mod ffprobe_info;
mod frame_source;
mod path_validator;
mod position_resolver;
mod text_render;
mod timecode;
mod video_matcher;
mod video_scanner;

pub use fcpxml_parser::{TimelineEntry, normalize_media_uri, parse_fcpxml, parse_fcpxml_file};
pub use ffprobe_info::{VideoMetadata, probe_video};
pub use frame_source::{FfmpegFrameSource, FrameSource};
pub use path_validator::{
    ensure_directory_exists, validate_directory_exists, validate_file_exists,
};
pub use position_resolver::{
    POSITION_EPS, PositionSpec, parse_position_specs, resolve_in_file, resolve_in_interval,
};
pub use text_render::TextRenderer;
pub use timecode::Timecode;
pub use video_matcher::{DEFAULT_SIMILARITY_THRESHOLD, MatchIndex, VideoMatch, has_video_extension};
pub use video_scanner::{VideoFileInfo, scan_video_files};
