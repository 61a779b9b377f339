//! SeaORM entity models
//!
//! Only the tag tables are mapped as entities; proposal and supervisor
//! listings go through raw joined SQL in the repository.

mod tag;
mod thesis_proposal_tag;

pub use tag::{
    Entity as TagEntity,
    Model as Tag,
    Column as TagColumn,
};

pub use thesis_proposal_tag::{
    Entity as ThesisProposalTagEntity,
    Model as ThesisProposalTag,
    Column as ThesisProposalTagColumn,
};
