pub mod console;
pub mod extract;
pub mod import;
pub mod naming;
pub mod rename;
pub mod runner;
pub mod scaffold;
pub mod select;
pub mod template;
pub mod textproc;

pub use console::ConsoleConfirmer;
pub use extract::ExtractStep;
pub use import::ImportStep;
pub use rename::RenameStep;
pub use runner::StepRunner;
pub use scaffold::ScaffoldStep;
pub use select::SelectStep;
