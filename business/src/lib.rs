pub mod application {
    pub mod product {
        pub mod catalog_view;
        pub mod create;
        pub mod debounce;
        pub mod delete;
        pub mod form;
        pub mod get_by_id;
        pub mod image_upload;
        pub mod synchronizer;
        pub mod update;
    }
}

pub mod domain {
    pub mod errors;
    pub mod logger;
    pub mod product {
        pub mod errors;
        pub mod filter;
        pub mod model;
        pub mod repository;
        pub mod services;
        pub mod snapshot;
        pub mod subscription;
        pub mod value_objects;
        pub mod use_cases {
            pub mod create;
            pub mod delete;
            pub mod get_by_id;
            pub mod progress;
            pub mod update;
        }
    }
}
