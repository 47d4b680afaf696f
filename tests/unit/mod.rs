/// Unit tests for the scheduling rules and habit statistics
mod recurrence_tests;
mod habit_stats_tests;
