use vkray::tutorials::shaders::ShadersTutorial;

fn main() {
    vkray::app::run::<ShadersTutorial>();
}
