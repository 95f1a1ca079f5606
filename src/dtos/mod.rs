pub mod jobdtos;
pub mod userdtos;
