//! Formily 2.x schema generation prompt

/// Components registered with the form renderer, as `name: binding` pairs
pub const COMPONENTS: &[(&str, &str)] = &[
    ("FormItem", "FormItem"),
    ("Input", "Input"),
    ("Select", "Select"),
    ("DatePicker", "DatePicker"),
    ("Switch", "Switch"),
    ("Radio", "Radio"),
    ("RadioGroup", "Radio.Group"),
    ("Checkbox", "Checkbox"),
    ("CheckboxGroup", "Checkbox.Group"),
    ("NumberPicker", "NumberPicker"),
    ("Upload", "Upload"),
    ("Transfer", "Transfer"),
    ("Cascader", "Cascader"),
    ("TimePicker", "TimePicker"),
    ("TreeSelect", "TreeSelect"),
    ("FormGrid", "FormGrid"),
    ("FormButtonGroup", "FormButtonGroup"),
    ("FormCollapse", "FormCollapse"),
    ("FormTab", "FormTab"),
    ("FormLayout", "FormLayout"),
    ("FormStep", "FormStep"),
    ("TextArea", "Input.TextArea"),
];

const EXAMPLE_SCHEMA: &str = r#"{
  "type": "object",
  "properties": {
    "fieldName": {
      "type": "string",
      "title": "Field title",
      "x-decorator": "FormItem",
      "x-component": "Input"
    }
  }
}"#;

/// Generate the system prompt instructing the model to emit a Formily schema
pub fn generate_formily_prompt() -> String {
    let components = COMPONENTS
        .iter()
        .map(|(name, binding)| {
            if name == binding {
                format!("    {},", name)
            } else {
                format!("    {}: {},", name, binding)
            }
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"You are an expert form designer. Based on the image and the description provided by the user, produce a JSON Schema that follows the Formily 2.x specification.

Requirements:
1. The generated schema MUST be valid JSON
2. Follow the Formily 2.x schema specification
3. Infer field types and layout from the contents of the image
4. Use the language of the form in the image for field titles
5. Add appropriate validation rules
6. Return ONLY the schema object, without any explanation
7. Components come from @formily/antd-v5
8. Use FormGrid and FormLayout for layout; control the layout mode through the `layout` property of FormLayout

Available components:
  components: {{
{components}
  }},

Example format:
{example}"#,
        components = components,
        example = EXAMPLE_SCHEMA
    )
}
