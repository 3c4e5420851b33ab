//! Page objects, one per studio area.

pub mod example_generation;
pub mod mock_server;
pub mod spec_browser;
pub mod spec_config;

pub use contract_test::{
    ContractRunPhase, ContractTestLocators, ContractTestPage, DrillDownDetail, RunOutcome,
    MIXED_OPERATION_ERROR,
};
pub use example_generation::{ExampleGenerationPage, ExampleLocators, ExampleTotals};
pub use mock_server::{MockOutcome, MockServerLocators, MockServerPage};
pub use spec_browser::{SpecBrowserLocators, SpecBrowserPage, StudioTab};
pub use spec_config::{SpecConfigLocators, SpecConfigPage};
