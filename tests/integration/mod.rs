/// Integration tests driving the tracker through its tools and server
mod timer_workflow;
mod task_series;
mod server_tests;
