pub mod service_container;
