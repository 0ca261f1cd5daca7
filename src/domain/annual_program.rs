//! Annual program aggregate: the yearly container owning program books.

use serde::{Deserialize, Serialize};

use crate::domain::program_book::{ProgramBook, ProgramBookStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AnnualProgramStatus {
    New,
    Programming,
    SubmittedFinal,
}

impl AnnualProgramStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnnualProgramStatus::New => "new",
            AnnualProgramStatus::Programming => "programming",
            AnnualProgramStatus::SubmittedFinal => "submittedFinal",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnualProgram {
    pub id: String,
    pub year: i32,
    pub status: AnnualProgramStatus,
}

impl AnnualProgram {
    pub fn new(id: impl Into<String>, year: i32) -> Self {
        Self {
            id: id.into(),
            year,
            status: AnnualProgramStatus::New,
        }
    }

    /// Derives the program's status from its books' statuses.
    ///
    /// No books means `new`; all books submitted final means
    /// `submittedFinal`; any book past `new` means `programming`.
    pub fn derive_status(books: &[ProgramBook]) -> AnnualProgramStatus {
        if books.is_empty() {
            return AnnualProgramStatus::New;
        }
        if books
            .iter()
            .all(|b| b.status == ProgramBookStatus::SubmittedFinal)
        {
            return AnnualProgramStatus::SubmittedFinal;
        }
        if books.iter().any(|b| b.status != ProgramBookStatus::New) {
            return AnnualProgramStatus::Programming;
        }
        AnnualProgramStatus::New
    }

    pub fn sync_status(&mut self, books: &[ProgramBook]) {
        self.status = Self::derive_status(books);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn book_with_status(id: &str, status: ProgramBookStatus) -> ProgramBook {
        let mut book = ProgramBook::new(id, "ap1");
        book.status = status;
        book
    }

    #[test]
    fn status_derivation_rules() {
        assert_eq!(AnnualProgram::derive_status(&[]), AnnualProgramStatus::New);

        let books = vec![
            book_with_status("b1", ProgramBookStatus::New),
            book_with_status("b2", ProgramBookStatus::New),
        ];
        assert_eq!(AnnualProgram::derive_status(&books), AnnualProgramStatus::New);

        let books = vec![
            book_with_status("b1", ProgramBookStatus::Programming),
            book_with_status("b2", ProgramBookStatus::New),
        ];
        assert_eq!(
            AnnualProgram::derive_status(&books),
            AnnualProgramStatus::Programming
        );

        let books = vec![
            book_with_status("b1", ProgramBookStatus::SubmittedFinal),
            book_with_status("b2", ProgramBookStatus::SubmittedFinal),
        ];
        assert_eq!(
            AnnualProgram::derive_status(&books),
            AnnualProgramStatus::SubmittedFinal
        );
    }
}
