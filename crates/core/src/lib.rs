mod apply;
mod config;
mod driver;
mod error;
mod exif_reader;
mod extract;
mod metadata;
mod planner;
mod sanitize;
mod sequence;
mod template;
mod video_reader;

pub use apply::{apply_rename, ensure_writable_dir, ApplyResult};
pub use config::{app_paths, load_config, load_config_from, AppConfig, AppPaths};
pub use driver::{
    run, BulkChoice, BulkMode, FileOutcome, Prompt, RenameStats, ReportEntry, RunOptions,
    RunReport,
};
pub use error::{ExtractError, RenameError};
pub use extract::{
    filesystem_timestamp, is_media_file, media_kind, MediaKind, MediaMetadataReader,
    MetadataReader,
};
pub use metadata::{Field, FieldValue, MetadataRecord, MetadataSource, PartialMetadata};
pub use planner::{plan_file, scan_inputs, PlanOptions, RenamePlan, ScanResult, SkipReason};
pub use sanitize::sanitize_filename;
pub use sequence::{is_protected, Resolver, PROTECTED_FILE_NAMES};
pub use template::{
    parse_template, render_template, validate_template, Template, TemplateError, TemplatePart,
    DEFAULT_TEMPLATE,
};
