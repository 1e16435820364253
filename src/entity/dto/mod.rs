pub mod reading_dto;
pub mod meter_command_dto;
