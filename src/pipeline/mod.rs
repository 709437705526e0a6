pub mod engine;
pub mod finetune;
pub mod gene_select;
pub mod score;
