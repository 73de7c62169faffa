// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Files written by `sporenet init`, `sporenet generate` and `sporenet header`.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::{Error, ProjectConfig, Result, CONFIG_FILE_NAME, DEFAULT_OUTPUT_DIR};

/// Directories created inside a new project.
pub const PROJECT_DIRS: [&str; 3] = ["models", "data", DEFAULT_OUTPUT_DIR];

/// C symbol holding the model bytes in generated firmware.
pub const MODEL_SYMBOL: &str = "sporenet_model_data";

const BYTES_PER_LINE: usize = 16;

/// Start of a TFLite flatbuffer, used when no converted model is available yet.
const PLACEHOLDER_MODEL: [u8; 8] = [0x18, 0x00, 0x00, 0x00, 0x54, 0x46, 0x4c, 0x33];

// --- init ---

pub fn validate_project_name(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(Error::InvalidProjectName(name.to_string()))
    }
}

/// Create `<root>/<name>` with the standard layout.
///
/// Returns every created directory and file, project root first.
pub fn init_project(root: &Path, name: &str) -> Result<Vec<PathBuf>> {
    validate_project_name(name)?;

    let project = root.join(name);
    if project.exists() {
        return Err(Error::ProjectExists(project));
    }

    let mut created = Vec::new();
    create_dir(&project, &mut created)?;
    for dir in PROJECT_DIRS {
        create_dir(&project.join(dir), &mut created)?;
    }

    let config_path = project.join(CONFIG_FILE_NAME);
    ProjectConfig::new(name).save(&config_path)?;
    created.push(config_path);

    let readme_path = project.join("README.md");
    write_file(&readme_path, &project_readme(name))?;
    created.push(readme_path);

    Ok(created)
}

pub fn project_readme(name: &str) -> String {
    format!(
        r#"# {name}

SporeNet project: ML model to ESP32 firmware.

## Layout

```
{name}/
├── sporenet.config.json   # build and serial settings
├── models/                # source models (.h5, .pt, .onnx)
├── data/                  # sample inputs
└── build/                 # converted model and firmware
```

## Usage

```bash
cp path/to/model.h5 models/model.h5
sporenet build
sporenet flash --port /dev/ttyUSB0
sporenet monitor --port /dev/ttyUSB0
```
"#
    )
}

// --- model arrays ---

/// Render `bytes` as a C array definition plus its length.
pub fn render_model_array(bytes: &[u8], symbol: &str) -> String {
    let mut out = String::with_capacity(bytes.len() * 6 + 128);
    let _ = write!(out, "const unsigned char {}[] = {{", symbol);
    for (i, b) in bytes.iter().enumerate() {
        if i % BYTES_PER_LINE == 0 {
            out.push_str("\n    ");
        }
        let _ = write!(out, "0x{:02x},", b);
    }
    let _ = write!(
        out,
        "\n}};\n\nconst int {}_len = {};\n",
        symbol,
        bytes.len()
    );
    out
}

/// Standalone header embedding a converted model.
pub fn render_model_header(bytes: &[u8]) -> String {
    format!(
        "// Generated by sporenet\n\
         // Model size: {} bytes\n\
         \n\
         #ifndef SPORENET_MODEL_H\n\
         #define SPORENET_MODEL_H\n\
         \n\
         #include <stdint.h>\n\
         \n\
         {}\n\
         #endif // SPORENET_MODEL_H\n",
        bytes.len(),
        render_model_array(bytes, MODEL_SYMBOL)
    )
}

/// Header path next to a converted model (`model.tflite` -> `model.h`).
pub fn header_path_for(model: &Path) -> PathBuf {
    model.with_extension("h")
}

// --- firmware project ---

const ROOT_CMAKE: &str = "\
cmake_minimum_required(VERSION 3.16)

include($ENV{IDF_PATH}/tools/cmake/project.cmake)

project(sporenet)
";

const MAIN_CMAKE: &str = r#"idf_component_register(
    SRCS "main.cpp" "model_data.cpp"
    INCLUDE_DIRS "."
    REQUIRES esp_timer
)
"#;

const MODEL_DATA_H: &str = "\
#ifndef MODEL_DATA_H
#define MODEL_DATA_H

#include <stdint.h>

extern const unsigned char sporenet_model_data[];
extern const int sporenet_model_data_len;

#endif  // MODEL_DATA_H
";

const MAIN_CPP: &str = r#"#include <stdio.h>
#include "freertos/FreeRTOS.h"
#include "freertos/task.h"
#include "esp_log.h"
#include "esp_timer.h"

#include "tensorflow/lite/micro/micro_interpreter.h"
#include "tensorflow/lite/micro/micro_mutable_op_resolver.h"
#include "tensorflow/lite/schema/schema_generated.h"

#include "model_data.h"

static const char *TAG = "sporenet";

namespace {
constexpr int kTensorArenaSize = 60 * 1024;
alignas(16) uint8_t tensor_arena[kTensorArenaSize];

const tflite::Model *model = nullptr;
tflite::MicroInterpreter *interpreter = nullptr;
TfLiteTensor *input = nullptr;
TfLiteTensor *output = nullptr;
}

static bool setup_model() {
    model = tflite::GetModel(sporenet_model_data);
    if (model->version() != TFLITE_SCHEMA_VERSION) {
        ESP_LOGE(TAG, "schema version %lu, expected %d",
                 (unsigned long)model->version(), TFLITE_SCHEMA_VERSION);
        return false;
    }

    static tflite::MicroMutableOpResolver<10> resolver;
    resolver.AddFullyConnected();
    resolver.AddConv2D();
    resolver.AddDepthwiseConv2D();
    resolver.AddReshape();
    resolver.AddSoftmax();
    resolver.AddLogistic();
    resolver.AddRelu();
    resolver.AddMean();
    resolver.AddPad();
    resolver.AddMaxPool2D();

    static tflite::MicroInterpreter static_interpreter(
        model, resolver, tensor_arena, kTensorArenaSize);
    interpreter = &static_interpreter;

    if (interpreter->AllocateTensors() != kTfLiteOk) {
        ESP_LOGE(TAG, "AllocateTensors() failed");
        return false;
    }

    input = interpreter->input(0);
    output = interpreter->output(0);
    ESP_LOGI(TAG, "arena used: %u bytes", (unsigned)interpreter->arena_used_bytes());
    return true;
}

static void run_inference() {
    // Replace with sensor data.
    for (size_t i = 0; i < input->bytes; i++) {
        input->data.int8[i] = (int8_t)((i % 256) - 128);
    }

    int64_t start = esp_timer_get_time();
    if (interpreter->Invoke() != kTfLiteOk) {
        ESP_LOGE(TAG, "Invoke() failed");
        return;
    }
    ESP_LOGI(TAG, "inference: %lld us", esp_timer_get_time() - start);

    for (int i = 0; i < output->dims->data[output->dims->size - 1]; i++) {
        float value = output->type == kTfLiteInt8
            ? (output->data.int8[i] - output->params.zero_point) * output->params.scale
            : output->data.f[i];
        ESP_LOGI(TAG, "output[%d] = %.6f", i, value);
    }
}

extern "C" void app_main(void) {
    ESP_LOGI(TAG, "model size: %d bytes", sporenet_model_data_len);
    if (!setup_model()) {
        return;
    }
    while (true) {
        run_inference();
        vTaskDelay(pdMS_TO_TICKS(5000));
    }
}
"#;

const SDKCONFIG: &str = "\
CONFIG_COMPILER_OPTIMIZATION_SIZE=y
CONFIG_COMPILER_OPTIMIZATION_ASSERTIONS_DISABLE=y
CONFIG_SPIRAM_USE_MALLOC=y
CONFIG_SPIRAM_TYPE_AUTO=y
CONFIG_FREERTOS_HZ=1000
CONFIG_LOG_DEFAULT_LEVEL_INFO=y
";

const BUILD_SH: &str = r#"#!/bin/sh
set -e

if [ -z "$IDF_PATH" ]; then
    echo "ESP-IDF not found: source \$IDF_PATH/export.sh first" >&2
    exit 1
fi

idf.py build
echo "Firmware: build/sporenet.bin"
"#;

const FIRMWARE_README: &str = r#"# SporeNet ESP32 Firmware

Generated by `sporenet` to run a TensorFlow Lite Micro model on an ESP32.

## Layout

```
firmware/
├── CMakeLists.txt         # ESP-IDF project
├── sdkconfig              # ESP-IDF configuration
├── build.sh               # build helper
├── components/            # extra components (e.g. tflite-micro)
└── main/
    ├── CMakeLists.txt     # main component
    ├── main.cpp           # model setup and inference loop
    ├── model_data.h       # model symbol declarations
    └── model_data.cpp     # model bytes
```

## Building

Requires ESP-IDF v4.4 or later.

```bash
. $IDF_PATH/export.sh
./build.sh
```

The image is written to `build/sporenet.bin`. Flash and watch it with:

```bash
sporenet flash --port /dev/ttyUSB0
sporenet monitor --port /dev/ttyUSB0
```

## Customization

- Input: replace the sample loop in `run_inference()` with sensor readings.
- Operations: register every op the model uses in `setup_model()`
  (`resolver.AddXxx()`), and raise the `MicroMutableOpResolver` size to match.
- Memory: adjust `kTensorArenaSize` in `main.cpp`; the boot log prints the
  arena bytes actually used.

## Troubleshooting

- `AllocateTensors() failed`: the tensor arena is too small.
- `Didn't find op` at startup: add the missing op to the resolver.
- `schema version` error: reconvert the model with a matching TensorFlow.
- Build errors about `IDF_PATH`: source ESP-IDF's `export.sh` first.
"#;

/// Relative paths of the files written by [`generate_firmware_project`].
pub const FIRMWARE_FILES: [&str; 8] = [
    "CMakeLists.txt",
    "main/CMakeLists.txt",
    "main/main.cpp",
    "main/model_data.h",
    "main/model_data.cpp",
    "sdkconfig",
    "build.sh",
    "README.md",
];

/// `model_data.cpp` for the given model bytes.
pub fn render_model_source(bytes: &[u8]) -> String {
    format!(
        "#include \"model_data.h\"\n\n// Model size: {} bytes\n\n{}",
        bytes.len(),
        render_model_array(bytes, MODEL_SYMBOL)
    )
}

/// Write an ESP-IDF project under `dir`, embedding `model` when it exists.
///
/// Returns the number of model bytes embedded, `None` when the placeholder
/// was used.
pub fn generate_firmware_project(dir: &Path, model: Option<&Path>) -> Result<Option<usize>> {
    let main_dir = dir.join("main");
    fs::create_dir_all(&main_dir).map_err(|e| Error::io(&main_dir, e))?;
    let components = dir.join("components");
    fs::create_dir_all(&components).map_err(|e| Error::io(&components, e))?;

    let model_bytes = match model {
        Some(path) if path.is_file() => Some(fs::read(path).map_err(|e| Error::io(path, e))?),
        _ => None,
    };
    let model_source = render_model_source(model_bytes.as_deref().unwrap_or(&PLACEHOLDER_MODEL));

    write_file(&dir.join("CMakeLists.txt"), ROOT_CMAKE)?;
    write_file(&main_dir.join("CMakeLists.txt"), MAIN_CMAKE)?;
    write_file(&main_dir.join("main.cpp"), MAIN_CPP)?;
    write_file(&main_dir.join("model_data.h"), MODEL_DATA_H)?;
    write_file(&main_dir.join("model_data.cpp"), &model_source)?;
    write_file(&dir.join("sdkconfig"), SDKCONFIG)?;
    write_file(&dir.join("README.md"), FIRMWARE_README)?;

    let build_sh = dir.join("build.sh");
    write_file(&build_sh, BUILD_SH)?;
    make_executable(&build_sh)?;

    Ok(model_bytes.map(|b| b.len()))
}

fn create_dir(path: &Path, created: &mut Vec<PathBuf>) -> Result<()> {
    fs::create_dir(path).map_err(|e| Error::io(path, e))?;
    created.push(path.to_path_buf());
    Ok(())
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    fs::write(path, contents).map_err(|e| Error::io(path, e))
}

#[cfg(unix)]
fn make_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o755)).map_err(|e| Error::io(path, e))
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> Result<()> {
    Ok(())
}
