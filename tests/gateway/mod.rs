mod delivery_tests;
mod lifecycle_tests;
