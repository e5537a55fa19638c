//! Stdin-backed operator prompts.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::domain::model::{CaseEntry, StepId};
use crate::domain::ports::{Confirmer, Decision};
use crate::utils::error::{CasefilesError, Result};
use crate::utils::fs::normalize_input_path;

/// Interactive [`Confirmer`] over stdin. With `assume_yes` every prompt
/// answers yes, which also means selection cannot fall back to a menu; a
/// case folder must then come from configuration or the saved path file.
pub struct ConsoleConfirmer {
    assume_yes: bool,
}

impl ConsoleConfirmer {
    pub fn new(assume_yes: bool) -> Self {
        Self { assume_yes }
    }

    fn prompt(&self, message: &str) -> Result<String> {
        print!("{}", message);
        io::stdout().flush()?;
        let mut line = String::new();
        io::stdin().read_line(&mut line)?;
        Ok(line.trim().to_string())
    }

    fn prompt_yes_no(&self, message: &str, default_yes: bool) -> Result<bool> {
        if self.assume_yes {
            return Ok(true);
        }
        let answer = self.prompt(message)?.to_lowercase();
        Ok(match answer.as_str() {
            "" => default_yes,
            "y" | "yes" | "예" => true,
            _ => false,
        })
    }
}

impl Confirmer for ConsoleConfirmer {
    fn confirm_step(&self, step: StepId, case_folder: Option<&Path>) -> Result<Decision> {
        if self.assume_yes {
            return Ok(Decision::Run);
        }
        println!();
        println!("=== {} ===", step);
        println!("{}", step.description());
        if let Some(folder) = case_folder {
            println!("사건 폴더: {}", folder.display());
        }
        let answer = self
            .prompt("실행하시겠습니까? (y: 실행 / s: 건너뛰기 / n: 중단) [y]: ")?
            .to_lowercase();
        Ok(match answer.as_str() {
            "" | "y" | "yes" | "예" => Decision::Run,
            "s" | "skip" => Decision::Skip,
            _ => Decision::Abort,
        })
    }

    fn pick_case(&self, entries: &[CaseEntry]) -> Result<Option<usize>> {
        if self.assume_yes {
            return Err(CasefilesError::MissingConfigError {
                field: "general.case_folder".to_string(),
            });
        }
        println!();
        println!("사건 폴더를 선택하세요:");
        for (i, entry) in entries.iter().enumerate() {
            println!("  {}. [{}] {}", i + 1, entry.root_name, entry.name);
        }
        println!("  c. 경로 직접 입력");

        loop {
            let answer = self.prompt("번호 입력: ")?;
            if answer.eq_ignore_ascii_case("c") {
                return Ok(None);
            }
            match answer.parse::<usize>() {
                Ok(n) if n >= 1 && n <= entries.len() => return Ok(Some(n - 1)),
                _ => println!("잘못된 입력입니다. 다시 입력해 주세요."),
            }
        }
    }

    fn confirm_saved_path(&self, path: &Path) -> Result<bool> {
        self.prompt_yes_no(
            &format!(
                "이전에 선택한 사건 폴더를 사용하시겠습니까? ({}) [y/n]: ",
                path.display()
            ),
            true,
        )
    }

    fn read_case_path(&self) -> Result<PathBuf> {
        if self.assume_yes {
            return Err(CasefilesError::MissingConfigError {
                field: "general.case_folder".to_string(),
            });
        }
        loop {
            let answer = self.prompt("사건 폴더 경로를 입력하세요: ")?;
            if answer.is_empty() {
                println!("경로가 비어 있습니다.");
                continue;
            }
            return Ok(normalize_input_path(&answer));
        }
    }

    fn confirm_create(&self, path: &Path) -> Result<bool> {
        self.prompt_yes_no(
            &format!(
                "폴더가 존재하지 않습니다. 생성하시겠습니까? ({}) [y/n]: ",
                path.display()
            ),
            true,
        )
    }

    fn confirm_extract_evidence(&self) -> Result<bool> {
        if self.assume_yes {
            return Ok(false);
        }
        let answer = self
            .prompt("증거 PDF도 텍스트를 추출하시겠습니까? [y/N]: ")?
            .to_lowercase();
        Ok(matches!(answer.as_str(), "y" | "yes" | "예"))
    }
}
