//! `display-*` commands forwarding to the [`crate::display::DisplayController`]
//! trait seam (SPEC_FULL.md §C).

use crate::command::{CommandCall, ParameterSpec};
use crate::display::DisplayRequest;
use crate::error::CommandError;
use crate::system::System;

pub static DISPLAY_BRIGHTNESS_PARAMS: &[ParameterSpec] =
    &[ParameterSpec::required_uint("percent").with_bounds(Some(0), Some(100))];

pub fn display_brightness(system: &System, call: &mut CommandCall) -> Result<(), CommandError> {
    let percent = call.uint(0) as u8;
    system.display.lock().unwrap().handle(DisplayRequest::Brightness { percent })?;
    call.result = "OK".to_string();
    Ok(())
}

pub static DISPLAY_CONFIGURE_PARAMS: &[ParameterSpec] = &[
    ParameterSpec::required_uint("rotation").with_bounds(Some(0), Some(360)),
    ParameterSpec::required_uint("invert").with_bounds(Some(0), Some(1)),
];

pub fn display_configure(system: &System, call: &mut CommandCall) -> Result<(), CommandError> {
    let rotation = call.uint(0) as u16;
    let invert = call.uint(1) != 0;
    system.display.lock().unwrap().handle(DisplayRequest::Configure { rotation, invert })?;
    call.result = "OK".to_string();
    Ok(())
}

pub static DISPLAY_ERASE_PARAMS: &[ParameterSpec] = &[];

pub fn display_erase(system: &System, call: &mut CommandCall) -> Result<(), CommandError> {
    system.display.lock().unwrap().handle(DisplayRequest::Erase)?;
    call.result = "OK".to_string();
    Ok(())
}

pub static DISPLAY_INFO_PARAMS: &[ParameterSpec] = &[];

pub fn display_info(system: &System, call: &mut CommandCall) -> Result<(), CommandError> {
    let info = system.display.lock().unwrap().info();
    call.result = format!(
        "width={} height={} brightness={}% pages={}",
        info.width, info.height, info.brightness_percent, info.page_count
    );
    Ok(())
}

pub static DISPLAY_PAGE_ADD_TEXT_PARAMS: &[ParameterSpec] = &[
    ParameterSpec::required_uint("page").with_bounds(Some(0), Some(255)),
    ParameterSpec::required_uint("x").with_bounds(Some(0), Some(65535)),
    ParameterSpec::required_uint("y").with_bounds(Some(0), Some(65535)),
    ParameterSpec::raw_tail("text"),
];

pub fn display_page_add_text(system: &System, call: &mut CommandCall) -> Result<(), CommandError> {
    let page = call.uint(0) as u8;
    let x = call.uint(1) as u16;
    let y = call.uint(2) as u16;
    let text = call.raw(3).to_string();
    system.display.lock().unwrap().handle(DisplayRequest::PageAddText { page, x, y, text })?;
    call.result = "OK".to_string();
    Ok(())
}

pub static DISPLAY_PAGE_ADD_IMAGE_PARAMS: &[ParameterSpec] = &[
    ParameterSpec::required_uint("page").with_bounds(Some(0), Some(255)),
    ParameterSpec::required_uint("x").with_bounds(Some(0), Some(65535)),
    ParameterSpec::required_uint("y").with_bounds(Some(0), Some(65535)),
    ParameterSpec::word("blob name"),
];

pub fn display_page_add_image(system: &System, call: &mut CommandCall) -> Result<(), CommandError> {
    let page = call.uint(0) as u8;
    let x = call.uint(1) as u16;
    let y = call.uint(2) as u16;
    let blob_name = call.word(3).to_string();
    system.display.lock().unwrap().handle(DisplayRequest::PageAddImage { page, x, y, blob_name })?;
    call.result = "OK".to_string();
    Ok(())
}

pub static DISPLAY_PAGE_REMOVE_PARAMS: &[ParameterSpec] =
    &[ParameterSpec::required_uint("page").with_bounds(Some(0), Some(255))];

pub fn display_page_remove(system: &System, call: &mut CommandCall) -> Result<(), CommandError> {
    let page = call.uint(0) as u8;
    system.display.lock().unwrap().handle(DisplayRequest::PageRemove { page })?;
    call.result = "OK".to_string();
    Ok(())
}
