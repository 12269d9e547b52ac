pub mod error;

pub mod shared {
    pub mod constants;
    pub mod frame;
    pub mod model_resolver;
    pub mod video_metadata;
}

pub mod recognition {
    pub mod domain {
        pub mod encoding;
        pub mod face_matcher;
        pub mod known_face_set;
        pub mod training_source;
    }
    pub mod infrastructure;
}

pub mod detection {
    pub mod domain {
        pub mod detection_scanner;
        pub mod hit_index_set;
    }
}

pub mod clipping {
    pub mod domain {
        pub mod clip_extractor;
        pub mod clip_window;
        pub mod range_merger;
        pub mod window_expander;
    }
}

pub mod video {
    pub mod domain {
        pub mod clip_writer;
        pub mod frame_source;
        pub mod image_reader;
    }
    pub mod infrastructure;
}

pub mod pipeline {
    pub mod batch_cursor;
    pub mod detect_faces_use_case;
    pub mod extract_clips_use_case;
    pub mod generate_encodings_use_case;
    pub mod infrastructure;
    pub mod pipeline_logger;
    pub mod run_pipeline_use_case;
    pub mod run_summary;
    pub mod scan_executor;
    pub mod scan_video_use_case;
    pub mod train_known_faces_use_case;
}
